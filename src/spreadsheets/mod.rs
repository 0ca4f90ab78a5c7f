pub mod csv_dataset;
pub mod export_xlsx;
pub mod table;

pub use csv_dataset::{read_dataset, write_dataset};
pub use export_xlsx::{export_dataset_xlsx, xlsx_path_for};
