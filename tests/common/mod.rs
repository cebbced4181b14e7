//! Throwaway HTTP responder for tests that must not reach the internet.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;

/// A canned response for requests whose path starts with `prefix`.
pub struct Route {
    pub prefix: &'static str,
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Route {
    pub fn ok(prefix: &'static str, content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Route {
            prefix,
            status: 200,
            content_type,
            body: body.into(),
        }
    }
}

/// Serves `routes` on an ephemeral local port and returns `http://127.0.0.1:<port>`.
/// Unknown paths get a 404. The server thread lives until the test process exits.
pub fn serve(routes: Vec<Route>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            if reader.read_line(&mut request_line).is_err() {
                continue;
            }
            loop {
                let mut header = String::new();
                match reader.read_line(&mut header) {
                    Ok(0) | Err(_) => break,
                    Ok(_) if header == "\r\n" || header == "\n" => break,
                    Ok(_) => {}
                }
            }

            let path = request_line.split_whitespace().nth(1).unwrap_or("/");
            let (status, content_type, body) = routes
                .iter()
                .find(|r| path.starts_with(r.prefix))
                .map(|r| (r.status, r.content_type, r.body.clone()))
                .unwrap_or((404, "text/plain", b"not found".to_vec()));

            let reason = if status == 200 { "OK" } else { "Error" };
            let head = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                reason,
                content_type,
                body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&body);
            let _ = stream.flush();
        }
    });

    format!("http://{}", addr)
}

/// A small PNG with the given size, for gallery and logo tests.
#[allow(dead_code)]
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([30, 120, 200]),
    ));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}
