pub mod cloud;
pub mod config;
pub mod extraction;
pub mod fusion;
pub mod geometry;
pub mod io;
pub mod pbmap;
pub mod segmentation;
pub mod system;
