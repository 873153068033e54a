/// Current API version, used as the path prefix (`/api/{version}/...`).
pub const API_VERSION: &str = "v0";
