use std::env;
use std::fs;

use imageops_matte::{parse_hex_color, BackdropMode, EditorConfig, EditorSession};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log_level = if env::var_os("MATTE_DEBUG").is_some() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 3 || args.len() > 5 {
        eprintln!(
            "Usage: {} <input_image> <output_stem> [sensitivity] [backdrop_color]",
            args[0]
        );
        eprintln!("Example: {} photo.jpg photo_cutout 70 #ffffff", args[0]);
        std::process::exit(1);
    }

    let input_path = &args[1];
    let output_stem = &args[2];

    let mut config = EditorConfig::default();
    if let Some(sensitivity) = args.get(3) {
        config.sensitivity = sensitivity.parse().map_err(|_| "Invalid sensitivity")?;
    }
    if let Some(color) = args.get(4) {
        config.solid_color = color.clone();
        config.backdrop = BackdropMode::Solid;
    }
    let config = config.clamped();

    let image = image::open(input_path)?.to_rgba8();
    println!("Processing image: {}x{}", image.width(), image.height());

    let mut session = EditorSession::new(image)?;
    session.segment(&config.segmentation_params())?;

    let png_path = format!("{output_stem}.png");
    fs::write(&png_path, session.export_png(&config.backdrop()?)?)?;
    println!("Wrote {png_path}");

    let jpeg_path = format!("{output_stem}.jpg");
    let jpeg = session.export_jpeg(parse_hex_color(&config.solid_color)?, config.jpeg_quality)?;
    fs::write(&jpeg_path, jpeg)?;
    println!("Wrote {jpeg_path}");

    Ok(())
}
