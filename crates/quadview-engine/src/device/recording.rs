//! Headless backend that records every call instead of touching a GPU.
//!
//! The device, its queues and its surfaces share one [`Journal`]. Failure
//! switches on the journal make each `make_*`/acquire step return `None`, which
//! exercises the renderer's skip and fatal paths without a real adapter.

use std::cell::{Ref, RefCell, RefMut};
use std::ops::Range;
use std::rc::Rc;

use winit::dpi::PhysicalSize;

use crate::assets::TextureImage;
use crate::render::PipelineDesc;

use super::backend::{
    CommandBuffer, CommandQueue, RenderDevice, RenderEncoder, RenderSurface, Submission,
};

/// Commands recorded inside a render pass.
#[derive(Debug, Clone, PartialEq)]
pub enum PassCommand {
    SetPipeline {
        pipeline: u64,
        format: wgpu::TextureFormat,
    },
    SetVertexBuffer {
        slot: u32,
        buffer: u64,
    },
    SetFragmentTexture {
        slot: u32,
        texture: u64,
    },
    Draw {
        topology: Option<wgpu::PrimitiveTopology>,
        vertices: Range<u32>,
        instances: Range<u32>,
    },
}

/// Journal entries in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    DrawableAcquired { drawable: u64 },
    CommandBufferCreated { buffer: u64 },
    PassBegun { buffer: u64, target: u64 },
    Pass { buffer: u64, command: PassCommand },
    PassEnded { buffer: u64 },
    PresentScheduled { buffer: u64, drawable: u64 },
    Committed { buffer: u64 },
    Waited { buffer: u64 },
    PixelFormatSet { requested: wgpu::TextureFormat, applied: wgpu::TextureFormat },
    RedrawRequested,
}

/// Shared record of everything the backend was asked to do.
#[derive(Debug, Default)]
pub struct Journal {
    pub events: Vec<Event>,

    pub buffers_made: u32,
    pub textures_made: u32,
    pub pipelines_made: u32,
    pub queues_made: u32,

    /// Buffers whose work has finished.
    pub completed: Vec<u64>,

    pub fail_queue: bool,
    pub fail_buffers: bool,
    pub fail_textures: bool,
    pub fail_command_buffers: bool,
    pub fail_encoders: bool,
    pub fail_drawables: bool,
    pub link_error: Option<String>,

    /// Completes submissions at commit time; otherwise only `wait` completes them.
    pub complete_on_commit: bool,

    next_id: u64,
}

impl Journal {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Draw commands across all encoded passes.
    pub fn draws(&self) -> Vec<PassCommand> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Pass {
                    command: cmd @ PassCommand::Draw { .. },
                    ..
                } => Some(cmd.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn committed(&self) -> Vec<u64> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Committed { buffer } => Some(*buffer),
                _ => None,
            })
            .collect()
    }

    pub fn waited(&self) -> Vec<u64> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Waited { buffer } => Some(*buffer),
                _ => None,
            })
            .collect()
    }

    pub fn redraw_requests(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::RedrawRequested))
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct RecordedBuffer {
    pub id: u64,
    pub label: String,
    pub contents: Vec<u8>,
}

impl RecordedBuffer {
    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.contents)
    }
}

#[derive(Debug, Clone)]
pub struct RecordedTexture {
    pub id: u64,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

#[derive(Debug, Clone)]
pub struct RecordedPipeline {
    pub id: u64,
    pub format: wgpu::TextureFormat,
    pub topology: wgpu::PrimitiveTopology,
    pub vertex: String,
    pub fragment: String,
}

#[derive(Debug)]
pub struct RecordedDrawable {
    pub id: u64,
    pub format: wgpu::TextureFormat,
}

/// Device half of the recording backend.
#[derive(Debug, Clone)]
pub struct RecordingDevice {
    journal: Rc<RefCell<Journal>>,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDevice {
    pub fn new() -> Self {
        let journal = Journal {
            complete_on_commit: true,
            ..Journal::default()
        };
        Self {
            journal: Rc::new(RefCell::new(journal)),
        }
    }

    /// Creates a surface sharing this device's journal.
    pub fn surface(&self, size: PhysicalSize<u32>, scale_factor: f64) -> RecordingSurface {
        RecordingSurface {
            journal: Rc::clone(&self.journal),
            format: wgpu::TextureFormat::Bgra8UnormSrgb,
            supported: None,
            size,
            scale_factor,
        }
    }

    pub fn journal(&self) -> Ref<'_, Journal> {
        self.journal.borrow()
    }

    /// Mutable access, for flipping failure switches.
    pub fn journal_mut(&self) -> RefMut<'_, Journal> {
        self.journal.borrow_mut()
    }
}

impl RenderDevice for RecordingDevice {
    type Buffer = RecordedBuffer;
    type Texture = RecordedTexture;
    type Pipeline = RecordedPipeline;
    type Drawable = RecordedDrawable;
    type Queue = RecordingQueue;

    fn make_command_queue(&self) -> Option<RecordingQueue> {
        let mut j = self.journal.borrow_mut();
        if j.fail_queue {
            return None;
        }
        j.queues_made += 1;
        Some(RecordingQueue {
            journal: Rc::clone(&self.journal),
        })
    }

    fn make_vertex_buffer(&self, label: &str, contents: &[u8]) -> Option<RecordedBuffer> {
        let mut j = self.journal.borrow_mut();
        if j.fail_buffers {
            return None;
        }
        j.buffers_made += 1;
        Some(RecordedBuffer {
            id: j.next_id(),
            label: label.to_string(),
            contents: contents.to_vec(),
        })
    }

    fn make_texture(&self, label: &str, image: &TextureImage) -> Option<RecordedTexture> {
        let mut j = self.journal.borrow_mut();
        if j.fail_textures {
            return None;
        }
        j.textures_made += 1;
        Some(RecordedTexture {
            id: j.next_id(),
            name: label.to_string(),
            width: image.width,
            height: image.height,
            format: image.format,
        })
    }

    fn texture_format(&self, texture: &RecordedTexture) -> wgpu::TextureFormat {
        texture.format
    }

    fn make_pipeline(&self, desc: &PipelineDesc<'_>) -> Result<RecordedPipeline, String> {
        let mut j = self.journal.borrow_mut();
        if let Some(err) = j.link_error.clone() {
            return Err(err);
        }
        j.pipelines_made += 1;
        Ok(RecordedPipeline {
            id: j.next_id(),
            format: desc.format,
            topology: desc.topology,
            vertex: desc.vertex.name.clone(),
            fragment: desc.fragment.name.clone(),
        })
    }
}

#[derive(Debug)]
pub struct RecordingQueue {
    journal: Rc<RefCell<Journal>>,
}

impl CommandQueue<RecordingDevice> for RecordingQueue {
    type CommandBuffer = RecordingCommandBuffer;

    fn make_command_buffer(&self) -> Option<RecordingCommandBuffer> {
        let mut j = self.journal.borrow_mut();
        if j.fail_command_buffers {
            return None;
        }
        let id = j.next_id();
        j.events.push(Event::CommandBufferCreated { buffer: id });
        Some(RecordingCommandBuffer {
            id,
            journal: Rc::clone(&self.journal),
        })
    }
}

#[derive(Debug)]
pub struct RecordingCommandBuffer {
    id: u64,
    journal: Rc<RefCell<Journal>>,
}

impl CommandBuffer<RecordingDevice> for RecordingCommandBuffer {
    type Encoder<'a> = RecordingEncoder<'a>;
    type Submission = RecordingSubmission;

    fn make_render_encoder<'a>(
        &'a mut self,
        target: &'a RecordedDrawable,
    ) -> Option<RecordingEncoder<'a>> {
        {
            let mut j = self.journal.borrow_mut();
            if j.fail_encoders {
                return None;
            }
            j.events.push(Event::PassBegun {
                buffer: self.id,
                target: target.id,
            });
        }
        Some(RecordingEncoder {
            buffer: self,
            topology: None,
        })
    }

    fn present(&mut self, drawable: RecordedDrawable) {
        self.journal.borrow_mut().events.push(Event::PresentScheduled {
            buffer: self.id,
            drawable: drawable.id,
        });
    }

    fn commit(self) -> RecordingSubmission {
        let mut j = self.journal.borrow_mut();
        j.events.push(Event::Committed { buffer: self.id });
        if j.complete_on_commit {
            j.completed.push(self.id);
        }
        RecordingSubmission {
            id: self.id,
            journal: Rc::clone(&self.journal),
        }
    }
}

pub struct RecordingEncoder<'a> {
    buffer: &'a mut RecordingCommandBuffer,
    topology: Option<wgpu::PrimitiveTopology>,
}

impl RecordingEncoder<'_> {
    fn push(&self, command: PassCommand) {
        self.buffer.journal.borrow_mut().events.push(Event::Pass {
            buffer: self.buffer.id,
            command,
        });
    }
}

impl RenderEncoder<RecordingDevice> for RecordingEncoder<'_> {
    fn set_pipeline(&mut self, pipeline: &RecordedPipeline) {
        self.topology = Some(pipeline.topology);
        self.push(PassCommand::SetPipeline {
            pipeline: pipeline.id,
            format: pipeline.format,
        });
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: &RecordedBuffer) {
        self.push(PassCommand::SetVertexBuffer {
            slot,
            buffer: buffer.id,
        });
    }

    fn set_fragment_texture(&mut self, slot: u32, texture: &RecordedTexture) {
        self.push(PassCommand::SetFragmentTexture {
            slot,
            texture: texture.id,
        });
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.push(PassCommand::Draw {
            topology: self.topology,
            vertices,
            instances,
        });
    }

    fn end_encoding(self) {
        self.buffer
            .journal
            .borrow_mut()
            .events
            .push(Event::PassEnded {
                buffer: self.buffer.id,
            });
    }
}

#[derive(Debug)]
pub struct RecordingSubmission {
    id: u64,
    journal: Rc<RefCell<Journal>>,
}

impl Submission for RecordingSubmission {
    fn is_complete(&self) -> bool {
        self.journal.borrow().completed.contains(&self.id)
    }

    fn wait(self) {
        let mut j = self.journal.borrow_mut();
        j.events.push(Event::Waited { buffer: self.id });
        if !j.completed.contains(&self.id) {
            j.completed.push(self.id);
        }
    }
}

/// Surface half of the recording backend.
#[derive(Debug)]
pub struct RecordingSurface {
    journal: Rc<RefCell<Journal>>,
    format: wgpu::TextureFormat,
    supported: Option<Vec<wgpu::TextureFormat>>,
    size: PhysicalSize<u32>,
    scale_factor: f64,
}

impl RecordingSurface {
    /// Restricts presentable formats; the first entry is the fallback.
    pub fn with_supported_formats(mut self, formats: Vec<wgpu::TextureFormat>) -> Self {
        if let Some(first) = formats.first() {
            self.format = *first;
        }
        self.supported = Some(formats);
        self
    }

    pub fn set_size(&mut self, size: PhysicalSize<u32>) {
        self.size = size;
    }
}

impl RenderSurface<RecordingDevice> for RecordingSurface {
    fn pixel_format(&self) -> wgpu::TextureFormat {
        self.format
    }

    fn set_pixel_format(&mut self, format: wgpu::TextureFormat) {
        let applied = match &self.supported {
            Some(formats) if !formats.contains(&format) => formats.first().copied().unwrap_or(self.format),
            _ => format,
        };
        self.format = applied;
        self.journal.borrow_mut().events.push(Event::PixelFormatSet {
            requested: format,
            applied,
        });
    }

    fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    fn current_drawable(&mut self) -> Option<RecordedDrawable> {
        let mut j = self.journal.borrow_mut();
        if j.fail_drawables || self.size.width == 0 || self.size.height == 0 {
            return None;
        }
        let id = j.next_id();
        j.events.push(Event::DrawableAcquired { drawable: id });
        Some(RecordedDrawable {
            id,
            format: self.format,
        })
    }

    fn request_redraw(&self) {
        self.journal.borrow_mut().events.push(Event::RedrawRequested);
    }
}
