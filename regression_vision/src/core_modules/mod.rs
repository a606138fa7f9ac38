pub mod change_region;
pub mod diff_renderer;
pub mod difference_reducer;
pub mod frame;
pub mod history;
pub mod normalizer;
pub mod region_extractor;
pub mod severity;
pub mod utils;
