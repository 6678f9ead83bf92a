pub mod menu_resource;
pub mod menu_root;
pub mod space;

pub use menu_resource::FuretuiMenuResource;
pub use menu_root::FuretuiMenuRoot;
pub use space::FuretuiSpace;
