//! The 1×1 transparent GIF served by the tracking pixel.

use axum::{
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};

/// GIF89a, one transparent pixel. Always 43 bytes.
pub static TRANSPARENT_GIF: [u8; 43] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3B,
];

/// Uncacheable `200 image/gif` response carrying [`TRANSPARENT_GIF`].
pub fn pixel_response() -> Response {
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("image/gif")),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-store, no-cache, must-revalidate"),
            ),
        ],
        &TRANSPARENT_GIF[..],
    )
        .into_response()
}
