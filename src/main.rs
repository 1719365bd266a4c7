use std::error::Error;
use std::path::{Path, PathBuf};

use clap::Parser;
use nalgebra::{Matrix4, Point3, Vector3};

use rast::color::RGBA8;
use rast::graphics::ColorImage;
use rast::options::RenderOptions;
use rast::passes::{DrawParams, Mesh, MeshDraw, Vertex};
use rast::renderer::Renderer;

/// Renders a test triangle through the geometry and resolve passes and
/// dumps the result as a BMP.
#[derive(Parser, Debug)]
struct Args {
    /// TOML render options
    #[arg(long)]
    options: Option<PathBuf>,

    #[arg(long, default_value = "dump.bmp")]
    output: PathBuf,

    #[arg(long)]
    width: Option<usize>,

    #[arg(long)]
    height: Option<usize>,
}

fn dump_image(data: &ColorImage, path: &Path) -> Result<(), Box<dyn Error>> {
    let (width, height) = data.size();
    let mut image = bmp::Image::new(width as u32, height as u32);

    for (x, y) in image.coordinates() {
        let color = data
            .at(x as usize, y as usize)
            .map(|value| RGBA8::from(*value))
            .unwrap_or_default();

        image.set_pixel(
            x,
            y,
            bmp::Pixel {
                r: color.r,
                g: color.g,
                b: color.b,
            },
        );
    }

    image.save(path)?;
    Ok(())
}

fn test_triangle() -> MeshDraw {
    let normal = Vector3::new(0.0, 0.0, -1.0);

    MeshDraw {
        mesh: Mesh::new(
            vec![
                Vertex::new(Point3::new(0.0, -0.5, 0.0), normal, Vector3::new(1.0, 0.0, 0.0)),
                Vertex::new(Point3::new(0.5, 0.5, 0.0), normal, Vector3::new(0.0, 1.0, 0.0)),
                Vertex::new(Point3::new(-0.5, 0.5, 0.0), normal, Vector3::new(0.0, 0.0, 1.0)),
            ],
            vec![0, 2, 1],
        ),
        params: DrawParams::new(
            Vector3::zeros(),
            &Matrix4::new_translation(&Vector3::new(0.0, 0.0, 0.5)),
        ),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut options = match &args.options {
        Some(path) => RenderOptions::load(path)?,
        None => RenderOptions::default(),
    };

    if let Some(width) = args.width {
        options.target.width = width;
    }

    if let Some(height) = args.height {
        options.target.height = height;
    }

    let mut renderer = Renderer::new(options)?;
    let output = renderer.render_frame(&[test_triangle()])?;

    let stats = renderer.stats();
    log::info!("{} calls", stats.calls);
    log::info!("{} faces processed", stats.faces_processed);
    log::info!("{} faces rendered", stats.faces_rendered);
    log::info!("{} fragments shaded", stats.fragments_shaded);

    dump_image(&output, &args.output)?;
    log::info!("dumped image to {}", args.output.display());

    Ok(())
}
