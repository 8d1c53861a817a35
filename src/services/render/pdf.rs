use super::world::{json_to_value, BookWorld};
use super::{DocumentRenderer, RenderDocument, COVER_PATH};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use typst::diag::{SourceDiagnostic, Warned};
use typst::foundations::Dict;
use typst_pdf::PdfOptions;

const TEMPLATE: &str = include_str!("template.typ");

/// Lays out a [`RenderDocument`] with Typst and exports it as PDF.
#[derive(Debug, Default, Clone)]
pub struct TypstRenderer;

impl TypstRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Blocking; call from a worker thread.
    pub fn render_blocking(&self, document: &RenderDocument) -> Result<Vec<u8>> {
        let book = serde_json::to_value(document).context("Failed to serialize document")?;
        let mut inputs = Dict::new();
        inputs.insert("book".into(), json_to_value(&book));

        let world = BookWorld::new(TEMPLATE, inputs, COVER_PATH, document.cover_image.clone());

        let Warned { output, warnings } = typst::compile(&world);
        for warning in &warnings {
            debug!("typst warning: {}", warning.message);
        }
        let compiled = output.map_err(|errors| anyhow!("Typst compilation failed: {}", describe(&errors)))?;

        let pdf = typst_pdf::pdf(&compiled, &PdfOptions::default())
            .map_err(|errors| anyhow!("PDF export failed: {}", describe(&errors)))?;
        info!("Rendered '{}': {} pages, {} bytes", document.title, compiled.pages.len(), pdf.len());
        Ok(pdf)
    }
}

fn describe(diagnostics: &[SourceDiagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.message.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[async_trait]
impl DocumentRenderer for TypstRenderer {
    async fn render(&self, document: &RenderDocument) -> Result<Vec<u8>> {
        let renderer = self.clone();
        let document = document.clone();
        tokio::task::spawn_blocking(move || renderer.render_blocking(&document))
            .await
            .context("Render task panicked")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::render::tests::sample_manuscript;

    fn sample_document() -> RenderDocument {
        RenderDocument::from_manuscript(&sample_manuscript(), "A Star Wars Fan Novel", "October 18, 2026", None)
    }

    #[test]
    fn test_render_produces_pdf() -> Result<()> {
        let pdf = TypstRenderer::new().render_blocking(&sample_document())?;
        assert!(pdf.starts_with(b"%PDF"));
        Ok(())
    }

    #[tokio::test]
    async fn test_async_render_runs_off_the_runtime() -> Result<()> {
        let pdf = TypstRenderer::new().render(&sample_document()).await?;
        assert!(pdf.starts_with(b"%PDF"));
        Ok(())
    }

    #[test]
    fn test_render_handles_empty_trace_and_no_chapters() -> Result<()> {
        let mut manuscript = sample_manuscript();
        manuscript.trace.clear();
        manuscript.chapters.clear();
        let document = RenderDocument::from_manuscript(&manuscript, "", "", None);

        let pdf = TypstRenderer::new().render_blocking(&document)?;
        assert!(pdf.starts_with(b"%PDF"));
        Ok(())
    }

    #[test]
    fn test_invalid_cover_is_reported() {
        let document = RenderDocument::from_manuscript(&sample_manuscript(), "", "", Some(b"not an image".to_vec()));
        assert!(TypstRenderer::new().render_blocking(&document).is_err());
    }
}
