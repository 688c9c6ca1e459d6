//! Lifecycle of the user-chosen logo.
//!
//! A picked logo file is exposed to the renderer as a transient object URL
//! (`blob:qistyle/<n>`), the same way a browser hands files to an image loader.
//! [`LogoSlot`] owns the URL currently in use and releases the previous one exactly
//! once, after the renderer has adopted its replacement.
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::options::OptionsPatch;
use crate::renderer::QrRenderer;

pub const OBJECT_URL_SCHEME: &str = "blob:qistyle/";

/// Handle to bytes registered in an [`ObjectUrlStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    entries: HashMap<String, Rc<[u8]>>,
}

/// Shared registry of live object URLs.
///
/// Cloning the store clones the handle, not the contents: the configurator and the
/// renderer look at the same set of URLs.
#[derive(Debug, Clone, Default)]
pub struct ObjectUrlStore {
    inner: Rc<RefCell<Registry>>,
}

impl ObjectUrlStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `bytes` and returns a fresh URL for them.
    pub fn create(&self, bytes: Vec<u8>) -> ObjectUrl {
        let mut registry = self.inner.borrow_mut();
        registry.next_id += 1;
        let url = format!("{}{}", OBJECT_URL_SCHEME, registry.next_id);
        registry.entries.insert(url.clone(), Rc::from(bytes));
        debug!(%url, "object URL created");
        ObjectUrl(url)
    }

    /// Releases `url`. Returns `false` if it was already released.
    pub fn revoke(&self, url: &ObjectUrl) -> bool {
        let released = self.inner.borrow_mut().entries.remove(url.as_str()).is_some();
        if released {
            debug!(%url, "object URL revoked");
        } else {
            warn!(%url, "object URL revoked twice");
        }
        released
    }

    /// Bytes behind a live URL.
    pub fn resolve(&self, url: &str) -> Option<Rc<[u8]>> {
        self.inner.borrow().entries.get(url).cloned()
    }

    pub fn is_live(&self, url: &ObjectUrl) -> bool {
        self.inner.borrow().entries.contains_key(url.as_str())
    }

    pub fn live_count(&self) -> usize {
        self.inner.borrow().entries.len()
    }
}

/// Owner of the object URL of the logo currently shown.
#[derive(Debug, Default)]
pub struct LogoSlot {
    current: Option<ObjectUrl>,
}

impl LogoSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&ObjectUrl> {
        self.current.as_ref()
    }

    /// Makes `bytes` the logo.
    ///
    /// The URL is created in the renderer's own [`ObjectUrlStore`] and handed to the
    /// renderer first; the previous URL is released only once the renderer accepted
    /// the new one. If the renderer rejects it, the new URL is released instead and
    /// the previous logo stays in place. An empty selection is ignored.
    pub fn select<R>(&mut self, bytes: Vec<u8>, renderer: &mut R) -> Result<()>
    where
        R: QrRenderer + ?Sized,
    {
        if bytes.is_empty() {
            debug!("empty logo selection ignored");
            return Ok(());
        }

        let store = renderer.object_urls().clone();
        let url = store.create(bytes);
        let patch = OptionsPatch {
            image: Some(Some(url.to_string())),
            ..OptionsPatch::default()
        };
        if let Err(err) = renderer.update(patch) {
            store.revoke(&url);
            return Err(err);
        }

        if let Some(previous) = self.current.replace(url) {
            store.revoke(&previous);
        }
        Ok(())
    }

    /// Removes the logo from the renderer and releases its URL.
    ///
    /// If the renderer rejects the removal, the logo stays in place and its URL live.
    pub fn clear<R: QrRenderer + ?Sized>(&mut self, renderer: &mut R) -> Result<()> {
        let Some(current) = self.current.take() else {
            return Ok(());
        };
        let patch = OptionsPatch {
            image: Some(None),
            ..OptionsPatch::default()
        };
        if let Err(err) = renderer.update(patch) {
            self.current = Some(current);
            return Err(err);
        }
        renderer.object_urls().revoke(&current);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::recording::RecordingRenderer;

    #[test]
    fn test_store_create_and_revoke() {
        let store = ObjectUrlStore::new();
        let a = store.create(vec![1, 2, 3]);
        let b = store.create(vec![4]);
        assert_ne!(a, b);
        assert!(a.as_str().starts_with(OBJECT_URL_SCHEME));
        assert_eq!(store.live_count(), 2);
        assert_eq!(store.resolve(a.as_str()).as_deref(), Some(&[1u8, 2, 3][..]));

        assert!(store.revoke(&a));
        assert!(!store.revoke(&a));
        assert!(store.resolve(a.as_str()).is_none());
        assert_eq!(store.live_count(), 1);
    }

    #[test]
    fn test_store_clones_share_entries() {
        let store = ObjectUrlStore::new();
        let view = store.clone();
        let url = store.create(vec![9]);
        assert!(view.is_live(&url));
    }

    #[test]
    fn test_select_a_then_b_leaves_one_live_url() {
        let mut renderer = RecordingRenderer::default();
        let store = renderer.object_urls.clone();
        let mut slot = LogoSlot::new();

        slot.select(b"logo-a".to_vec(), &mut renderer).unwrap();
        let a = slot.current().cloned().unwrap();
        slot.select(b"logo-b".to_vec(), &mut renderer).unwrap();
        let b = slot.current().cloned().unwrap();

        assert_eq!(store.live_count(), 1);
        assert!(!store.is_live(&a));
        assert!(store.is_live(&b));
        assert_eq!(renderer.options.image.as_deref(), Some(b.as_str()));
    }

    #[test]
    fn test_previous_url_released_after_adoption() {
        let mut renderer = RecordingRenderer::default();
        let store = renderer.object_urls.clone();
        let mut slot = LogoSlot::new();
        slot.select(b"logo-a".to_vec(), &mut renderer).unwrap();
        let a = slot.current().cloned().unwrap();

        // The renderer sees A still live at the moment B is handed over.
        renderer.observe(a.clone());
        slot.select(b"logo-b".to_vec(), &mut renderer).unwrap();
        assert_eq!(renderer.observed_live, Some(true));
        assert!(!store.is_live(&a));
    }

    #[test]
    fn test_rejected_logo_keeps_previous() {
        let mut renderer = RecordingRenderer::default();
        let store = renderer.object_urls.clone();
        let mut slot = LogoSlot::new();
        slot.select(b"logo-a".to_vec(), &mut renderer).unwrap();
        let a = slot.current().cloned().unwrap();

        renderer.fail_updates = true;
        assert!(slot.select(b"logo-b".to_vec(), &mut renderer).is_err());
        assert_eq!(slot.current(), Some(&a));
        assert!(store.is_live(&a));
        assert_eq!(store.live_count(), 1);
    }

    #[test]
    fn test_empty_selection_ignored() {
        let mut renderer = RecordingRenderer::default();
        let store = renderer.object_urls.clone();
        let mut slot = LogoSlot::new();
        slot.select(Vec::new(), &mut renderer).unwrap();
        assert!(slot.current().is_none());
        assert_eq!(store.live_count(), 0);
        assert!(renderer.updates.is_empty());
    }

    #[test]
    fn test_clear_releases() {
        let mut renderer = RecordingRenderer::default();
        let store = renderer.object_urls.clone();
        let mut slot = LogoSlot::new();
        slot.select(b"logo".to_vec(), &mut renderer).unwrap();
        slot.clear(&mut renderer).unwrap();
        assert_eq!(store.live_count(), 0);
        assert!(renderer.options.image.is_none());
        slot.clear(&mut renderer).unwrap();
    }

    #[test]
    fn test_rejected_clear_keeps_logo() {
        let mut renderer = RecordingRenderer::default();
        let mut slot = LogoSlot::new();
        slot.select(b"logo".to_vec(), &mut renderer).unwrap();
        let current = slot.current().cloned().unwrap();

        renderer.fail_updates = true;
        assert!(slot.clear(&mut renderer).is_err());
        assert_eq!(slot.current(), Some(&current));
        assert!(renderer.object_urls.is_live(&current));
    }
}
