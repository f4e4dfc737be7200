pub mod apply_alpha_mask;
pub mod box_filter;
pub mod brush;
pub mod compositor;
pub mod export;
pub mod history;
pub mod mask;
pub mod segmentation;
pub mod summed_area_table;
pub mod worker;
