use base64::{engine::general_purpose::STANDARD, Engine as _};

const FALLBACK_MIME: &str = "image/jpeg";

pub fn encode_image(image_data: &[u8]) -> String {
    STANDARD.encode(image_data)
}

/// MIME type sniffed from the leading bytes. Only labels the data URI, nothing is rejected.
pub fn image_mime_type(image_data: &[u8]) -> &'static str {
    image::guess_format(image_data)
        .map(|format| format.to_mime_type())
        .unwrap_or(FALLBACK_MIME)
}

pub fn data_uri(image_data: &[u8], base64_image: &str) -> String {
    format!("data:{};base64,{}", image_mime_type(image_data), base64_image)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn encodes_standard_padded_base64() {
        assert_eq!(encode_image(b"leaf"), "bGVhZg==");
        assert_eq!(encode_image(&[]), "");
    }

    #[test]
    fn png_bytes_are_labelled_png() {
        assert_eq!(image_mime_type(PNG_SIGNATURE), "image/png");
    }

    #[test]
    fn jpeg_bytes_are_labelled_jpeg() {
        assert_eq!(image_mime_type(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]), "image/jpeg");
    }

    #[test]
    fn unknown_bytes_fall_back_to_jpeg() {
        assert_eq!(image_mime_type(b"definitely not an image"), "image/jpeg");
    }

    #[test]
    fn data_uri_carries_mime_and_payload() {
        let encoded = encode_image(PNG_SIGNATURE);

        assert_eq!(
            data_uri(PNG_SIGNATURE, &encoded),
            format!("data:image/png;base64,{encoded}")
        );
    }
}
