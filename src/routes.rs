use crate::{
    api::{attendance, employee},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    // Check-in/out runs face inference; it gets a tighter limit than
    // the rest of the protected surface.
    let attendance_limiter = Arc::new(build_limiter(config.rate_attendance_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(
                web::scope("/attendance")
                    // /attendance/check-in
                    .service(
                        web::resource("/check-in")
                            .wrap(attendance_limiter.clone())
                            .route(web::post().to(attendance::check_in)),
                    )
                    // /attendance/check-out
                    .service(
                        web::resource("/check-out")
                            .wrap(attendance_limiter.clone())
                            .route(web::post().to(attendance::check_out)),
                    )
                    // /attendance/office-location
                    .service(
                        web::resource("/office-location")
                            .route(web::get().to(attendance::office_location)),
                    )
                    // /attendance
                    .service(web::resource("").route(web::get().to(attendance::list_attendance)))
                    // /attendance/{id}
                    .service(
                        web::resource("/{id}").route(web::get().to(attendance::get_attendance)),
                    ),
            )
            .service(
                web::scope("/employees")
                    // /employees/verify-face
                    .service(
                        web::resource("/verify-face")
                            .wrap(attendance_limiter.clone())
                            .route(web::post().to(employee::verify_face)),
                    )
                    // /employees
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // /employees/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(employee::update_employee))
                            .route(web::get().to(employee::get_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            ),
    );
}
