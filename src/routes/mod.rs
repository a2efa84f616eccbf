//! Rutas de la API
//! 
//! Routers de Axum que exponen el subsistema de asignaciones a la capa
//! de UI.

pub mod assignment_routes;

pub use assignment_routes::create_assignment_router;
