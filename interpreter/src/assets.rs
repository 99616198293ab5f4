/// An image asset ("costume") addressable by name from generated code.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub name: String,
    pub data: Vec<u8>,
}

impl Asset {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Asset {
            name: name.into(),
            data,
        }
    }

    /// Media type guessed from the file extension of the asset name.
    pub fn media_type(&self) -> &'static str {
        let ext = self
            .name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "svg" => "image/svg+xml",
            "webp" => "image/webp",
            _ => "application/octet-stream",
        }
    }
}

/// Ordered collection of assets. Lookups return the first asset with a
/// matching name, so re-adding a name keeps the original visible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetStore {
    assets: Vec<Asset>,
}

impl AssetStore {
    pub fn new() -> Self {
        AssetStore::default()
    }

    pub fn add(&mut self, asset: Asset) {
        self.assets.push(asset);
    }

    pub fn get(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.name == name)
    }

    /// Remove every asset called `name`; returns how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.assets.len();
        self.assets.retain(|a| a.name != name);
        before - self.assets.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.assets.iter()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl FromIterator<Asset> for AssetStore {
    fn from_iter<I: IntoIterator<Item = Asset>>(iter: I) -> Self {
        AssetStore {
            assets: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_asset_wins() {
        let mut store = AssetStore::new();
        store.add(Asset::new("cat.png", vec![1]));
        store.add(Asset::new("cat.png", vec![2]));
        assert_eq!(store.get("cat.png").map(|a| a.data.clone()), Some(vec![1]));
        assert_eq!(store.remove("cat.png"), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn media_type_from_extension() {
        assert_eq!(Asset::new("Cat.PNG", vec![]).media_type(), "image/png");
        assert_eq!(Asset::new("noext", vec![]).media_type(), "application/octet-stream");
    }
}
