/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules,
/// enforcing a Defense-in-Depth strategy. This structure ensures that
/// access control is applied explicitly at the module level (via Axum layers),
/// preventing accidental exposure of protected endpoints.
///
/// The three modules map directly to the defined access roles.

/// Routes accessible to all visitors (reading, registration, login/logout).
pub mod public;

/// Routes requiring a resolved identity. The gate is in-handler: anonymous
/// requests are redirected to the login page rather than rejected outright.
pub mod authenticated;

/// Routes restricted exclusively to the administrator role, guarded by the
/// `admin_gate` route layer before any handler runs.
pub mod admin;
