//! Heatmap rendering: click mapping, density accumulation, coloring, compositing

pub mod color;
pub mod composite;
pub mod density;
pub mod mapping;

pub use color::{ColorRamp, GradientStop};
pub use composite::{composite_over, load_base_image, paint_overlay, save_heatmap};
pub use density::{
    DenseField, DensityField, FieldKind, FieldStrategy, SparseField, Splat, build_density,
    duplicate_counts, plan_splats, splat_radius,
};
pub use mapping::{MappedPoint, map_click, map_clicks};
