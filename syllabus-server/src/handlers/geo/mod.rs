pub mod handle_geo;
