pub mod catchers;
pub mod config;
pub mod cors;
pub mod error;
pub mod routes;
pub mod sessions;
pub mod store;

use rocket::{Build, Rocket, catchers, routes};
use crate::catchers::{bad_request, forbidden, internal_error, not_found, unauthorized, unprocessable};
use crate::config::AppConfig;
use crate::cors::Cors;
use crate::routes::*;

pub fn build_rocket(state: AppState, config: &AppConfig) -> Rocket<Build> {
    rocket::build()
        .attach(Cors::new(config.allowed_origin.clone()))
        .manage(state)
        .mount(
            "/api",
            routes![
                all_options,
                voter_login,
                voter_logout,
                get_ballot,
                cast_selection,
                voter_results,
                list_candidates,
                admin_register,
                admin_login,
                admin_logout,
                add_candidate,
                update_candidate,
                delete_candidate,
                election_results,
                audit_stored_votes,
                audit_rows
            ],
        )
        .register(
            "/",
            catchers![
                unauthorized,
                forbidden,
                bad_request,
                unprocessable,
                internal_error,
                not_found
            ],
        )
}

#[cfg(test)]
mod tests;
