use std::io::Cursor;

use wgpu::TextureFormat as F;
use winit::dpi::PhysicalSize;

use quadview_engine::assets::{AssetBundle, TextureOptions};
use quadview_engine::device::recording::{Event, PassCommand, RecordingDevice, RecordingSurface};
use quadview_engine::render::{geometry, ProgramLibrary};
use quadview_engine::{FrameRenderer, FrameStatus, RendererConfig, SetupError, SkipReason};

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 128, 0, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn config() -> RendererConfig {
    RendererConfig {
        assets: AssetBundle::in_memory()
            .with_asset("sample.png", png(8, 4))
            .with_asset("sample@2x.png", png(16, 8)),
        ..RendererConfig::default()
    }
}

fn surface(device: &RecordingDevice) -> RecordingSurface {
    device.surface(PhysicalSize::new(640, 480), 1.0)
}

fn ready() -> (RecordingDevice, RecordingSurface, FrameRenderer<RecordingDevice>) {
    let device = RecordingDevice::new();
    let mut surface = surface(&device);
    let renderer = FrameRenderer::setup(&device, &mut surface, &config()).unwrap();
    (device, surface, renderer)
}

#[test]
fn setup_creates_every_resource_once() {
    let (device, _surface, renderer) = ready();

    let j = device.journal();
    assert_eq!(j.queues_made, 1);
    assert_eq!(j.buffers_made, 2);
    assert_eq!(j.textures_made, 1);
    assert_eq!(j.pipelines_made, 1);

    assert_eq!(renderer.buffers().positions.contents.len(), 64);
    assert_eq!(renderer.buffers().tex_coords.contents.len(), 32);
    assert_eq!((renderer.texture().width, renderer.texture().height), (8, 4));
    assert_eq!(renderer.pipeline_count(), 1);
}

#[test]
fn setup_matches_surface_format_to_texture() {
    let (device, surface, renderer) = ready();

    use quadview_engine::device::RenderSurface;
    assert_eq!(renderer.texture_format(), F::Rgba8UnormSrgb);
    assert_eq!(surface.pixel_format(), F::Rgba8UnormSrgb);
    assert_eq!(renderer.active_format(), F::Rgba8UnormSrgb);
    assert_eq!(renderer.pipeline().map(|p| p.format), Some(F::Rgba8UnormSrgb));
    assert_eq!(
        device.journal().events,
        vec![Event::PixelFormatSet {
            requested: F::Rgba8UnormSrgb,
            applied: F::Rgba8UnormSrgb,
        }]
    );
}

#[test]
fn linear_texture_option_selects_linear_surface() {
    let device = RecordingDevice::new();
    let mut surface = surface(&device);
    let config = RendererConfig {
        texture: TextureOptions { srgb: false },
        ..config()
    };

    let renderer = FrameRenderer::setup(&device, &mut surface, &config).unwrap();
    assert_eq!(renderer.active_format(), F::Rgba8Unorm);
}

#[test]
fn high_density_surface_loads_scaled_texture() {
    let device = RecordingDevice::new();
    let mut surface = device.surface(PhysicalSize::new(1280, 960), 2.0);

    let renderer = FrameRenderer::setup(&device, &mut surface, &config()).unwrap();
    assert_eq!(renderer.texture().name, "sample@2x.png");
    assert_eq!((renderer.texture().width, renderer.texture().height), (16, 8));
}

#[test]
fn frame_encodes_one_textured_strip_in_order() {
    let (device, mut surface, mut renderer) = ready();
    device.journal_mut().events.clear();

    assert_eq!(renderer.on_frame(&mut surface), FrameStatus::Presented);

    let j = device.journal();
    let drawable = match j.events[0] {
        Event::DrawableAcquired { drawable } => drawable,
        ref other => panic!("frame started with {other:?}"),
    };
    let buffer = match j.events[1] {
        Event::CommandBufferCreated { buffer } => buffer,
        ref other => panic!("expected command buffer, got {other:?}"),
    };
    let pipeline = renderer.pipeline().unwrap();
    let pass = |command| Event::Pass { buffer, command };

    assert_eq!(
        j.events,
        vec![
            Event::DrawableAcquired { drawable },
            Event::CommandBufferCreated { buffer },
            Event::PassBegun {
                buffer,
                target: drawable
            },
            pass(PassCommand::SetPipeline {
                pipeline: pipeline.id,
                format: F::Rgba8UnormSrgb,
            }),
            pass(PassCommand::SetVertexBuffer {
                slot: geometry::POSITION_SLOT,
                buffer: renderer.buffers().positions.id,
            }),
            pass(PassCommand::SetVertexBuffer {
                slot: geometry::TEX_COORD_SLOT,
                buffer: renderer.buffers().tex_coords.id,
            }),
            pass(PassCommand::SetFragmentTexture {
                slot: geometry::TEXTURE_SLOT,
                texture: renderer.texture().id,
            }),
            pass(PassCommand::Draw {
                topology: Some(wgpu::PrimitiveTopology::TriangleStrip),
                vertices: 0..4,
                instances: 0..1,
            }),
            Event::PassEnded { buffer },
            Event::PresentScheduled { buffer, drawable },
            Event::Committed { buffer },
            Event::Waited { buffer },
        ]
    );
}

#[test]
fn every_frame_draws_four_vertices_once() {
    let (device, mut surface, mut renderer) = ready();

    for _ in 0..3 {
        renderer.on_frame(&mut surface);
    }

    let draws = device.journal().draws();
    assert_eq!(draws.len(), 3);
    for draw in draws {
        assert!(matches!(
            draw,
            PassCommand::Draw { vertices, instances, .. } if vertices == (0..4) && instances == (0..1)
        ));
    }
    assert_eq!(device.journal().buffers_made, 2);
    assert_eq!(device.journal().textures_made, 1);
}

#[test]
fn resize_reapplies_format_and_requests_redraw() {
    let (device, mut surface, mut renderer) = ready();
    let pipeline_id = renderer.pipeline().unwrap().id;
    device.journal_mut().events.clear();

    surface.set_size(PhysicalSize::new(1024, 768));
    renderer
        .on_resize(&device, &mut surface, PhysicalSize::new(1024, 768))
        .unwrap();
    renderer
        .on_resize(&device, &mut surface, PhysicalSize::new(1024, 768))
        .unwrap();

    let j = device.journal();
    let set = Event::PixelFormatSet {
        requested: F::Rgba8UnormSrgb,
        applied: F::Rgba8UnormSrgb,
    };
    assert_eq!(
        j.events,
        vec![set.clone(), Event::RedrawRequested, set, Event::RedrawRequested]
    );
    assert_eq!(j.buffers_made, 2);
    assert_eq!(j.textures_made, 1);
    assert_eq!(j.pipelines_made, 1);
    assert_eq!(renderer.pipeline().unwrap().id, pipeline_id);
}

#[test]
fn missing_drawable_skips_without_side_effects() {
    let (device, mut surface, mut renderer) = ready();
    device.journal_mut().events.clear();

    surface.set_size(PhysicalSize::new(0, 0));
    assert_eq!(
        renderer.on_frame(&mut surface),
        FrameStatus::Skipped(SkipReason::NoDrawable)
    );

    let j = device.journal();
    assert!(j.events.is_empty());
    assert!(j.draws().is_empty());
    assert!(j.committed().is_empty());
}

#[test]
fn missing_command_buffer_skips_frame() {
    let (device, mut surface, mut renderer) = ready();
    device.journal_mut().fail_command_buffers = true;

    assert_eq!(
        renderer.on_frame(&mut surface),
        FrameStatus::Skipped(SkipReason::NoCommandBuffer)
    );
    assert!(device.journal().committed().is_empty());
}

#[test]
fn missing_encoder_skips_present_and_commit() {
    let (device, mut surface, mut renderer) = ready();
    device.journal_mut().fail_encoders = true;

    assert_eq!(
        renderer.on_frame(&mut surface),
        FrameStatus::Skipped(SkipReason::NoEncoder)
    );
    let j = device.journal();
    assert!(j.draws().is_empty());
    assert!(j.committed().is_empty());
    assert!(!j
        .events
        .iter()
        .any(|e| matches!(e, Event::PresentScheduled { .. })));
}

#[test]
fn rendering_resumes_after_skipped_frames() {
    let (device, mut surface, mut renderer) = ready();

    surface.set_size(PhysicalSize::new(0, 0));
    renderer.on_frame(&mut surface);
    surface.set_size(PhysicalSize::new(320, 240));
    renderer.on_frame(&mut surface);

    assert_eq!(device.journal().draws().len(), 1);
    assert_eq!(renderer.stats().presented, 1);
    assert_eq!(renderer.stats().skipped, 1);
}

#[test]
fn unpresentable_texture_format_falls_back() {
    let device = RecordingDevice::new();
    let mut surface = surface(&device).with_supported_formats(vec![F::Bgra8UnormSrgb, F::Bgra8Unorm]);

    let mut renderer = FrameRenderer::setup(&device, &mut surface, &config()).unwrap();
    assert_eq!(renderer.texture_format(), F::Rgba8UnormSrgb);
    assert_eq!(renderer.active_format(), F::Bgra8UnormSrgb);
    assert_eq!(renderer.pipeline().map(|p| p.format), Some(F::Bgra8UnormSrgb));

    renderer.on_frame(&mut surface);
    let j = device.journal();
    assert!(j.events.iter().any(|e| matches!(
        e,
        Event::Pass {
            command: PassCommand::SetPipeline {
                format: F::Bgra8UnormSrgb,
                ..
            },
            ..
        }
    )));
}

#[test]
fn format_change_links_once_per_format() {
    let device = RecordingDevice::new();
    let mut primary = surface(&device);
    let mut renderer = FrameRenderer::setup(&device, &mut primary, &config()).unwrap();

    let mut external = surface(&device).with_supported_formats(vec![F::Bgra8UnormSrgb]);
    renderer
        .on_resize(&device, &mut external, PhysicalSize::new(640, 480))
        .unwrap();
    assert_eq!(renderer.active_format(), F::Bgra8UnormSrgb);
    assert_eq!(renderer.pipeline_count(), 2);

    renderer
        .on_resize(&device, &mut primary, PhysicalSize::new(640, 480))
        .unwrap();
    renderer
        .on_resize(&device, &mut external, PhysicalSize::new(640, 480))
        .unwrap();
    assert_eq!(renderer.pipeline_count(), 2);
    assert_eq!(device.journal().pipelines_made, 2);
}

#[test]
fn failed_format_change_skips_frames_until_linked() {
    use quadview_engine::device::RenderSurface;

    let (device, _primary, mut renderer) = ready();
    device.journal_mut().link_error = Some("unsupported blend target".into());

    let mut external = surface(&device).with_supported_formats(vec![F::Bgra8UnormSrgb]);
    let err = renderer
        .on_resize(&device, &mut external, PhysicalSize::new(640, 480))
        .unwrap_err();
    assert!(matches!(err, SetupError::PipelineLink { .. }));
    assert_eq!(external.pixel_format(), renderer.active_format());
    assert!(renderer.pipeline().is_none());

    device.journal_mut().events.clear();
    assert_eq!(
        renderer.on_frame(&mut external),
        FrameStatus::Skipped(SkipReason::NoPipeline)
    );
    {
        let j = device.journal();
        assert!(j.events.is_empty());
        assert!(j.draws().is_empty());
    }

    device.journal_mut().link_error = None;
    renderer
        .on_resize(&device, &mut external, PhysicalSize::new(640, 480))
        .unwrap();
    assert_eq!(renderer.on_frame(&mut external), FrameStatus::Presented);
    assert_eq!(renderer.pipeline().map(|p| p.format), Some(F::Bgra8UnormSrgb));
}

#[test]
fn missing_queue_is_fatal() {
    let device = RecordingDevice::new();
    device.journal_mut().fail_queue = true;
    let mut surface = surface(&device);

    let err = FrameRenderer::setup(&device, &mut surface, &config()).err().unwrap();
    assert!(matches!(err, SetupError::NoCommandQueue));
    assert_eq!(device.journal().textures_made, 0);
}

#[test]
fn missing_asset_is_fatal() {
    let device = RecordingDevice::new();
    let mut surface = surface(&device);
    let config = RendererConfig {
        asset_name: "HighSierra.png".into(),
        ..config()
    };

    let err = FrameRenderer::setup(&device, &mut surface, &config).err().unwrap();
    assert!(matches!(err, SetupError::AssetNotFound { ref name, .. } if name == "HighSierra.png"));
    assert_eq!(device.journal().buffers_made, 0);
}

#[test]
fn buffer_failure_is_fatal() {
    let device = RecordingDevice::new();
    device.journal_mut().fail_buffers = true;
    let mut surface = surface(&device);

    let err = FrameRenderer::setup(&device, &mut surface, &config()).err().unwrap();
    assert!(matches!(err, SetupError::BufferAllocation { .. }));
}

#[test]
fn unknown_program_is_fatal() {
    let device = RecordingDevice::new();
    let mut surface = surface(&device);
    let config = RendererConfig {
        fragment_program: "fragmentShader".into(),
        ..config()
    };

    let err = FrameRenderer::setup(&device, &mut surface, &config).err().unwrap();
    assert!(matches!(err, SetupError::ProgramNotFound { ref name, .. } if name == "fragmentShader"));
    assert_eq!(device.journal().pipelines_made, 0);
}

#[test]
fn custom_library_programs_are_used() {
    let device = RecordingDevice::new();
    let mut surface = surface(&device);
    let config = RendererConfig {
        library: ProgramLibrary::from_wgsl(
            "custom",
            "@vertex fn vs_quad() {}\n@fragment fn fs_quad() {}",
        ),
        vertex_program: "vs_quad".into(),
        fragment_program: "fs_quad".into(),
        ..config()
    };

    let renderer = FrameRenderer::setup(&device, &mut surface, &config).unwrap();
    let pipeline = renderer.pipeline().unwrap();
    assert_eq!((pipeline.vertex.as_str(), pipeline.fragment.as_str()), ("vs_quad", "fs_quad"));
}

#[test]
fn link_failure_is_fatal() {
    let device = RecordingDevice::new();
    device.journal_mut().link_error = Some("incompatible attachment".into());
    let mut surface = surface(&device);

    let err = FrameRenderer::setup(&device, &mut surface, &config()).err().unwrap();
    assert!(err.to_string().contains("incompatible attachment"));
}
