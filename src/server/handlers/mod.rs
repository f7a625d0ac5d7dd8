//! HTTP request handlers for the web server.

mod datasets;
mod helpers;
mod images;
mod media;
mod text;
mod users;

pub use datasets::{chart, delete_file, get_file, statistics, update_file, upload_file};
pub use images::{
    batch_upload, color_histogram, convert_image, crop_image, delete_image, get_image,
    resize_image, update_image, upload_image,
};
pub use media::{health, serve_media};
pub use text::{
    categorize, custom_query, index_documents, keywords, search, sentiment, summarize, visualize,
};
pub use users::{login, refresh, signup};
