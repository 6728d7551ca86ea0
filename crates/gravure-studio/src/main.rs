use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use gravure_engine::device::gpu::{GpuContext, GpuInit, KernelSources, WgpuDevice, WgpuTarget};
use gravure_engine::logging::{init_logging, LoggingConfig};
use gravure_engine::ops::{ClipOp, OpList};
use gravure_engine::paint::{ImageHandle, LinearGradient, Srgba};
use gravure_engine::path::{Path, PathBuilder};
use gravure_engine::stroke::{DashPattern, StrokeCap, StrokeJoin, StrokeStyle};
use gravure_engine::{Affine2D, ComputeRenderer, Rect, RendererConfig, Vec2, Viewport};

#[derive(Parser)]
#[command(author, version, about = "Render the gravure demo scene to a PNG")]
struct Arguments {
    /// Directory holding the compiled kernel sources (`elements.wgsl`, ...).
    #[arg(long, short = 'k', value_parser)]
    kernels: PathBuf,

    #[arg(long, short = 'o', value_parser, default_value = "gravure.png")]
    output: PathBuf,

    #[arg(long, default_value_t = 800)]
    width: u32,

    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Frames to render; later frames exercise the caches.
    #[arg(long, default_value_t = 1)]
    frames: u32,

    /// Request GPU timings and log them.
    #[arg(long)]
    profile: bool,

    /// Expand solid strokes in the kernels instead of on the CPU.
    #[arg(long)]
    gpu_strokes: bool,
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());
    let args = Arguments::parse();

    let kernels = KernelSources::from_dir(&args.kernels)
        .with_context(|| format!("loading kernels from {}", args.kernels.display()))?;
    let ctx = GpuContext::headless_blocking(GpuInit::default())?;
    let device = WgpuDevice::from_context(ctx, &kernels);

    let config = RendererConfig { gpu_strokes: args.gpu_strokes, ..RendererConfig::default() };
    let mut renderer = ComputeRenderer::new(device, config).context("creating renderer")?;

    let viewport = Viewport::new(args.width, args.height);
    let target_tex = renderer.device().device().create_texture(&wgpu::TextureDescriptor {
        label: Some("gravure studio target"),
        size: wgpu::Extent3d {
            width: viewport.width,
            height: viewport.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let target = WgpuTarget::new(&target_tex);

    let photo = checkerboard(64, 8);
    for frame in 0..args.frames.max(1) {
        let ops = demo_scene(viewport, &photo, frame, args.profile);
        renderer.frame(&ops, viewport, &target).context("rendering frame")?;
        if let Some(profile) = renderer.profile() {
            log::info!("frame {frame}: {profile}");
        }
    }

    let pixels = renderer
        .device_mut()
        .read_texture(&target_tex)
        .context("reading back target")?;
    image::save_buffer(
        &args.output,
        &pixels,
        viewport.width,
        viewport.height,
        image::ExtendedColorType::Rgba8,
    )
    .with_context(|| format!("writing {}", args.output.display()))?;
    log::info!("wrote {}", args.output.display());

    renderer.release();
    Ok(())
}

/// Builds a scene touching every paint path: clears, clipped fills,
/// gradients, transformed images and dashed strokes.
fn demo_scene(viewport: Viewport, photo: &ImageHandle, frame: u32, profile: bool) -> OpList {
    let mut ops = OpList::new();
    if profile {
        ops.profile();
    }

    // Opaque background; becomes a clear.
    ops.color(Srgba::opaque(0xf4, 0xf1, 0xea));
    ops.paint();

    let w = viewport.width as f32;
    let h = viewport.height as f32;

    ops.push_clip(ClipOp::path(rounded_rect(Rect::new(24.0, 24.0, w * 0.5, h * 0.45), 18.0)));
    ops.linear_gradient(LinearGradient::two_stop(
        Vec2::new(24.0, 24.0),
        Srgba::opaque(0x1d, 0x4e, 0x89),
        Vec2::new(w * 0.5, h * 0.45),
        Srgba::opaque(0x7f, 0xc8, 0xf8),
    ));
    ops.paint();
    ops.pop();

    let center = Vec2::new(w * 0.72, h * 0.3);
    ops.push_clip(ClipOp::stroke(
        star(center, 90.0, 40.0, 5),
        StrokeStyle::new(10.0).with_join(StrokeJoin::Round).with_miter(4.0),
    ));
    ops.color(Srgba::new(0xe0, 0x3a, 0x3e, 0xe0));
    ops.paint();
    ops.pop();

    let mut wave = PathBuilder::new();
    wave.move_to(Vec2::new(40.0, h * 0.8));
    for i in 0..6 {
        let x = 40.0 + i as f32 * (w - 80.0) / 6.0;
        let step = (w - 80.0) / 6.0;
        let dy = if i % 2 == 0 { -60.0 } else { 60.0 };
        wave.quad_to(Vec2::new(x + step * 0.5, h * 0.8 + dy), Vec2::new(x + step, h * 0.8));
    }
    let dashed = StrokeStyle::new(6.0)
        .with_cap(StrokeCap::Round)
        .with_dashes(DashPattern::new(frame as f32 * 4.0, [24.0, 12.0]));
    ops.push_clip(ClipOp::stroke(wave.build(), dashed));
    ops.color(Srgba::opaque(0x2a, 0x2a, 0x2a));
    ops.paint();
    ops.pop();

    let spin = frame as f32 * 0.1 + 0.3;
    ops.push_transform(
        Affine2D::translation(Vec2::new(w * 0.25, h * 0.55)) * Affine2D::rotation(Vec2::new(64.0, 64.0), spin),
    );
    ops.image(photo.clone());
    ops.paint();
    ops.pop();

    ops.fill_rect(Rect::new(w * 0.55, h * 0.55, w * 0.9, h * 0.7), Srgba::new(0x3c, 0xa0, 0x5a, 0x99));
    ops
}

fn rounded_rect(r: Rect, radius: f32) -> Path {
    let mut b = PathBuilder::new();
    b.move_to(Vec2::new(r.min.x + radius, r.min.y));
    b.line_to(Vec2::new(r.max.x - radius, r.min.y));
    b.arc(Vec2::new(r.max.x - radius, r.min.y + radius), std::f32::consts::FRAC_PI_2);
    b.line_to(Vec2::new(r.max.x, r.max.y - radius));
    b.arc(Vec2::new(r.max.x - radius, r.max.y - radius), std::f32::consts::FRAC_PI_2);
    b.line_to(Vec2::new(r.min.x + radius, r.max.y));
    b.arc(Vec2::new(r.min.x + radius, r.max.y - radius), std::f32::consts::FRAC_PI_2);
    b.line_to(Vec2::new(r.min.x, r.min.y + radius));
    b.arc(Vec2::new(r.min.x + radius, r.min.y + radius), std::f32::consts::FRAC_PI_2);
    b.close();
    b.build()
}

fn star(center: Vec2, outer: f32, inner: f32, points: u32) -> Path {
    let mut b = PathBuilder::new();
    let n = points * 2;
    for i in 0..n {
        let angle = i as f32 * std::f32::consts::TAU / n as f32 - std::f32::consts::FRAC_PI_2;
        let radius = if i % 2 == 0 { outer } else { inner };
        let p = center + Vec2::new(angle.cos(), angle.sin()) * radius;
        if i == 0 {
            b.move_to(p);
        } else {
            b.line_to(p);
        }
    }
    b.close();
    b.build()
}

fn checkerboard(size: u32, cell: u32) -> ImageHandle {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let dark = ((x / cell) + (y / cell)) % 2 == 0;
            let px = if dark { [0x44, 0x2c, 0x6e, 0xff] } else { [0xf2, 0xc1, 0x4e, 0xff] };
            pixels.extend_from_slice(&px);
        }
    }
    ImageHandle::new(size, size, pixels)
}
