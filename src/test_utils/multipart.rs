use axum::{
    extract::{FromRequest, Multipart},
    http::Request,
};

pub(crate) enum MultipartPart<'a> {
    Text {
        name: &'a str,
        value: &'a str,
    },
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

impl<'a> MultipartPart<'a> {
    pub(crate) fn text(name: &'a str, value: &'a str) -> Self {
        Self::Text { name, value }
    }

    pub(crate) fn file(
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    ) -> Self {
        Self::File {
            name,
            file_name,
            content_type,
            bytes,
        }
    }
}

pub(crate) const MULTIPART_BOUNDARY: &str = "MY_BOUNDARY123456789";

/// Encode `parts` as a `multipart/form-data` body with [MULTIPART_BOUNDARY].
pub(crate) fn multipart_body(parts: &[MultipartPart<'_>]) -> Vec<u8> {
    let mut body: Vec<u8> = Vec::new();

    for part in parts {
        body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());

        match part {
            MultipartPart::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            MultipartPart::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                        Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }

        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    body
}

pub(crate) async fn must_make_multipart(parts: &[MultipartPart<'_>]) -> Multipart {
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(multipart_body(parts).into())
        .unwrap();

    Multipart::from_request(request, &()).await.unwrap()
}
