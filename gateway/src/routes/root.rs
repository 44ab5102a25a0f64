//! `GET /` — gives the root path something human-readable instead of a 404.

use crate::version;

pub async fn root() -> String {
    version::get_version_string()
}
