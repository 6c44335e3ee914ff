pub mod patch_grid;
pub mod prefix_decoder;
