use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Request, Response};
use rocket::http::Header;

/// Answers cross-origin requests from origins starting with `allowed_origin`.
pub struct Cors {
    allowed_origin: String,
}

impl Cors {
    pub fn new(allowed_origin: impl Into<String>) -> Self {
        Self { allowed_origin: allowed_origin.into() }
    }
}

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response
        }
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let Some(origin) = req.headers().get_one("Origin") else { return };

        if origin.starts_with(&self.allowed_origin) {
            res.set_header(Header::new("Access-Control-Allow-Origin", origin.to_string()));
            res.set_header(Header::new("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS"));
            res.set_header(Header::new("Access-Control-Allow-Headers", "Content-Type, Authorization"));
            res.set_header(Header::new("Access-Control-Max-Age", "86400"));
        }
    }
}
