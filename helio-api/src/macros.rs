//! Macros shared by the API crate.

/// Implement `FromRef<AppState>` for each `Type => field` pair, so handlers
/// can extract one service instead of the whole state.
///
/// ```ignore
/// impl_from_ref! {
///     ReportService => reports,
///     CacheService => cache_admin,
/// }
/// ```
#[macro_export]
macro_rules! impl_from_ref {
    ($($type:ty => $field:ident),+ $(,)?) => {
        $(
            impl axum::extract::FromRef<$crate::state::AppState> for $type {
                fn from_ref(state: &$crate::state::AppState) -> Self {
                    state.$field.clone()
                }
            }
        )+
    };
}
