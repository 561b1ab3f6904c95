pub mod distance;
pub mod extract;
pub mod geocode;
pub mod render;
pub mod select;
pub mod year_index;

pub use distance::{great_circle_distance, Coordinate};
pub use extract::{FilmRecord, RecordExtractor};
pub use geocode::{GeocodeError, Geocoder, NominatimGeocoder, Throttled};
pub use select::{select_closest, Candidate, SelectionPolicy};
pub use year_index::{index_by_year, YearIndex};

use log::info;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilmMapError {
    #[error("Failed to read dataset: {0}")]
    Extract(#[from] extract::ExtractError),
    #[error("Failed to write map: {0}")]
    Render(#[from] render::RenderError),
}

/// Extracts the dataset, indexes it for `year`, and selects in-range filming locations.
pub fn find_nearby_films<P, G>(
    dataset: P,
    year: u32,
    reference: Coordinate,
    geocoder: &mut G,
    policy: &SelectionPolicy,
) -> Result<Vec<Candidate>, FilmMapError>
where
    P: AsRef<Path>,
    G: Geocoder,
{
    let records = RecordExtractor::parse_file(dataset)?;
    let index = index_by_year(&records, year);
    let candidates = select_closest(&index, reference, geocoder, policy);
    info!(
        "Found nearby films — year={} reference={},{} candidates={}",
        year,
        reference.lat,
        reference.lon,
        candidates.len()
    );
    Ok(candidates)
}
