mod action_bar;
mod app;
mod canvas;
mod theme;
mod ui_controls;

use eframe::egui;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() -> eframe::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bodymap=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let viewport = egui::ViewportBuilder::default()
        .with_title("Body Map")
        .with_inner_size([1100.0, 860.0])
        .with_min_inner_size([640.0, 560.0]);

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "Body Map",
        options,
        Box::new(|cc| Box::new(app::BodyMapApp::new(cc))),
    )
}
