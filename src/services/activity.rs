//! Cálculo de actividad
//! 
//! Función pura que deriva si una asignación está activa a partir de su
//! fecha de fin y el instante de la escritura.

use chrono::{DateTime, Utc};

/// Una asignación está activa cuando no tiene fecha de fin o cuando la
/// fecha de fin es estrictamente posterior a `now`.
pub fn compute_is_active(end_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match end_date {
        None => true,
        Some(end) => end > now,
    }
}
