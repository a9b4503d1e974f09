//! Macros for ergonomic target construction.

/// Build [`RawParams`](crate::core::RawParams) from `key => value` pairs.
///
/// # Example
///
/// ```
/// use waypoint::params;
///
/// let params = params! { "id" => 42, "tab" => "info" };
///
/// assert_eq!(params.len(), 2);
/// assert_eq!(params.get("tab"), Some(&serde_json::json!("info")));
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::core::RawParams::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::core::RawParams::new()$(.with($key, $value))+
    };
}
