//! Modelos de dominio
//! 
//! Este módulo contiene las entidades del subsistema de asignaciones.

pub mod assignment;

pub use assignment::*;
