// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod bills;
pub mod dashboard;
pub mod dialogs;
pub mod filter;
pub mod format;
pub mod ids;
pub mod markup;
pub mod model;
pub mod new_bill;
pub mod routes;
pub mod state;
pub mod store;
pub mod view;

pub use bills::*;
pub use dashboard::*;
pub use dialogs::*;
pub use filter::*;
pub use format::*;
pub use ids::*;
pub use model::*;
pub use new_bill::*;
pub use routes::*;
pub use state::*;
pub use store::*;
pub use view::*;
