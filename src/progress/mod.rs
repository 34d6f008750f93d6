pub mod bar;

pub use bar::create_upload_progress;
