//! File, store, and artifact I/O for the tributary pipeline.

mod align;
mod archive;
mod attribute_store;
mod csv_source;
mod domain;
mod error;
mod layout;
mod reader;
mod station_map;
mod writer;

pub use align::{align, BasinSeries};
pub use archive::SampleArchive;
pub use attribute_store::{
    AttributeColumn, AttributeStore, AttributeTable, AttributeValue, ColumnKind,
};
pub use domain::{BasinId, DateRange, ExperimentName, StationName};
pub use error::IoError;
pub use layout::DataLayout;
pub use reader::{parse_date, DischargeSeries, Forcing, ForcingTable, TimeSeriesLoader};
pub use station_map::StationMap;
pub use writer::{ManifestEntry, SampleWriter};
