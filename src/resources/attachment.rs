//! Named render targets shared between passes

use crate::backend::traits::*;
use crate::backend::types::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Stable identity of an attachment within a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttachmentId(pub(crate) u32);

/// A named image a pass can render into or sample from
#[derive(Debug)]
pub struct Attachment {
    id: AttachmentId,
    name: String,
    extent: Extent2d,
    format: TextureFormat,
    texture: TextureHandle,
    view: TextureViewHandle,
}

impl Attachment {
    pub fn id(&self) -> AttachmentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extent(&self) -> Extent2d {
        self.extent
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn is_depth(&self) -> bool {
        self.format.is_depth()
    }

    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    pub fn view(&self) -> TextureViewHandle {
        self.view
    }
}

/// Name-keyed attachment store used by backends.
///
/// Requesting a name again with identical extent and format hands back the
/// existing attachment without allocating.
#[derive(Debug, Default)]
pub struct AttachmentRegistry {
    attachments: HashMap<String, Arc<Attachment>>,
    next_id: u32,
}

impl AttachmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `name`, or allocate it through `create` if it does not exist yet
    pub fn get_or_create<F>(
        &mut self,
        name: &str,
        extent: Extent2d,
        format: TextureFormat,
        create: F,
    ) -> BackendResult<Arc<Attachment>>
    where
        F: FnOnce() -> BackendResult<(TextureHandle, TextureViewHandle)>,
    {
        if let Some(existing) = self.attachments.get(name) {
            if existing.extent != extent || existing.format != format {
                return Err(BackendError::AttachmentMismatch {
                    name: name.to_string(),
                });
            }
            return Ok(existing.clone());
        }

        let (texture, view) = create()?;
        let attachment = Arc::new(Attachment {
            id: AttachmentId(self.next_id),
            name: name.to_string(),
            extent,
            format,
            texture,
            view,
        });
        self.next_id += 1;
        self.attachments.insert(name.to_string(), attachment.clone());
        Ok(attachment)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Attachment>> {
        self.attachments.get(name)
    }

    pub fn len(&self) -> usize {
        self.attachments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handles(n: u64) -> BackendResult<(TextureHandle, TextureViewHandle)> {
        Ok((TextureHandle(n), TextureViewHandle(n)))
    }

    #[test]
    fn test_same_request_returns_same_attachment() {
        let mut registry = AttachmentRegistry::new();
        let extent = Extent2d::new(1280, 720);

        let first = registry
            .get_or_create("scene_color", extent, TextureFormat::Rgba16Float, || handles(1))
            .unwrap();
        let second = registry
            .get_or_create("scene_color", extent, TextureFormat::Rgba16Float, || {
                panic!("must not allocate twice")
            })
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_conflicting_request_is_rejected() {
        let mut registry = AttachmentRegistry::new();
        registry
            .get_or_create(
                "depth",
                Extent2d::new(1920, 1080),
                TextureFormat::Depth32Float,
                || handles(1),
            )
            .unwrap();

        let result = registry.get_or_create(
            "depth",
            Extent2d::new(1280, 720),
            TextureFormat::Depth32Float,
            || handles(2),
        );
        assert!(matches!(result, Err(BackendError::AttachmentMismatch { .. })));
    }

    #[test]
    fn test_ids_are_distinct() {
        let mut registry = AttachmentRegistry::new();
        let extent = Extent2d::new(4, 4);
        let a = registry
            .get_or_create("a", extent, TextureFormat::Rgba8Unorm, || handles(1))
            .unwrap();
        let b = registry
            .get_or_create("b", extent, TextureFormat::Rgba8Unorm, || handles(2))
            .unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(registry.get("b").unwrap().texture(), TextureHandle(2));
    }
}
