pub mod maintenance_service;
pub mod path_resolver;
pub mod propagation_service;

pub use maintenance_service::{PathIssue, PathMaintenanceService, PathReport};
pub use path_resolver::{PathResolver, ResolvedPath};
pub use propagation_service::{DescendantPropagator, PropagationStats};
