use axum::{Router, routing::{delete, get}};
use crate::{AppState, controllers::holdings_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/api/holdings",
            get(holdings_controller::list_holdings).post(holdings_controller::create_holding),
        )
        .route("/api/holdings/:id", delete(holdings_controller::delete_holding))
}
