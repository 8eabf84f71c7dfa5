pub mod check;
pub mod run;
pub mod sessions;
pub mod utils;
