use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::device::RenderDevice;
use crate::error::{SetupError, SetupResult};

use super::geometry;
use super::program::{Program, ProgramLibrary, ProgramStage};

/// Everything a backend needs to link a quad pipeline.
#[derive(Debug)]
pub struct PipelineDesc<'a> {
    pub label: &'a str,
    pub library: &'a ProgramLibrary,
    pub vertex: &'a Program,
    pub fragment: &'a Program,
    /// Color attachment format the pipeline writes.
    pub format: wgpu::TextureFormat,
    pub topology: wgpu::PrimitiveTopology,
    /// Layouts indexed by vertex buffer slot.
    pub vertex_layouts: &'a [wgpu::VertexBufferLayout<'static>],
}

/// Links the quad programs into pipelines, one per output format.
///
/// Pipelines are immutable once built; a format change produces a new pipeline
/// rather than mutating an existing one. Built pipelines are kept for the
/// builder's lifetime so switching back to a format is free.
#[derive(Debug)]
pub struct PipelineBuilder<P> {
    library: ProgramLibrary,
    vertex: String,
    fragment: String,
    cache: HashMap<wgpu::TextureFormat, P>,
}

impl<P> PipelineBuilder<P> {
    pub fn new(
        library: ProgramLibrary,
        vertex: impl Into<String>,
        fragment: impl Into<String>,
    ) -> Self {
        Self {
            library,
            vertex: vertex.into(),
            fragment: fragment.into(),
            cache: HashMap::new(),
        }
    }

    /// Links a fresh pipeline for `format`, bypassing the cache.
    pub fn build<D>(&self, device: &D, format: wgpu::TextureFormat) -> SetupResult<P>
    where
        D: RenderDevice<Pipeline = P>,
    {
        link(device, &self.library, &self.vertex, &self.fragment, format)
    }

    /// Returns the pipeline for `format`, linking it on first use.
    pub fn ensure<D>(&mut self, device: &D, format: wgpu::TextureFormat) -> SetupResult<&P>
    where
        D: RenderDevice<Pipeline = P>,
    {
        let Self {
            library,
            vertex,
            fragment,
            cache,
        } = self;

        match cache.entry(format) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let pipeline = link(device, library, vertex, fragment, format)?;
                Ok(e.insert(pipeline))
            }
        }
    }

    pub fn get(&self, format: wgpu::TextureFormat) -> Option<&P> {
        self.cache.get(&format)
    }

    /// Number of distinct formats a pipeline has been linked for.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

fn link<D: RenderDevice>(
    device: &D,
    library: &ProgramLibrary,
    vertex: &str,
    fragment: &str,
    format: wgpu::TextureFormat,
) -> SetupResult<D::Pipeline> {
    let vertex = lookup(library, vertex, ProgramStage::Vertex)?;
    let fragment = lookup(library, fragment, ProgramStage::Fragment)?;
    let layouts = geometry::vertex_layouts();

    let desc = PipelineDesc {
        label: "quadview pipeline",
        library,
        vertex,
        fragment,
        format,
        topology: wgpu::PrimitiveTopology::TriangleStrip,
        vertex_layouts: &layouts,
    };

    let pipeline = device
        .make_pipeline(&desc)
        .map_err(|message| SetupError::PipelineLink { format, message })?;

    log::debug!(
        "linked pipeline {}+{} for {format:?}",
        vertex.name,
        fragment.name
    );
    Ok(pipeline)
}

fn lookup<'l>(
    library: &'l ProgramLibrary,
    name: &str,
    expected: ProgramStage,
) -> SetupResult<&'l Program> {
    let program = library
        .function(name)
        .ok_or_else(|| SetupError::ProgramNotFound {
            name: name.to_string(),
            library: library.label().to_string(),
        })?;

    if program.stage != expected {
        return Err(SetupError::ProgramStage {
            name: name.to_string(),
            expected,
            found: program.stage,
        });
    }
    Ok(program)
}
