//! Crop cache wrapper.

use crate::cache::{Cache, Ttl};
use crate::domain::{invalidate_view, CacheKey, CropId, Domain, Filters, PlotId};
use crate::models::Crop;

#[derive(Debug, Clone)]
pub struct CropCache {
    cache: Cache,
}

impl CropCache {
    pub const DEFAULT_TTL: Ttl = Ttl::Medium;

    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    pub async fn get_crops(&self, plot: &PlotId, filters: &Filters) -> Option<Vec<Crop>> {
        let key = CacheKey::CropsByPlot(plot.clone(), filters.clone());
        self.cache.get(&key.to_string()).await
    }

    pub async fn set_crops(&self, plot: &PlotId, filters: &Filters, crops: &[Crop], ttl: Option<Ttl>) {
        let key = CacheKey::CropsByPlot(plot.clone(), filters.clone());
        self.cache
            .set(&key.to_string(), crops, Some(ttl.unwrap_or(Self::DEFAULT_TTL)))
            .await;
    }

    pub async fn get_active_crop(&self, plot: &PlotId) -> Option<Crop> {
        self.cache
            .get(&CacheKey::ActiveCrop(plot.clone()).to_string())
            .await
    }

    pub async fn set_active_crop(&self, crop: &Crop, ttl: Option<Ttl>) {
        let key = CacheKey::ActiveCrop(crop.plot_id.clone());
        self.cache
            .set(&key.to_string(), crop, Some(ttl.unwrap_or(Self::DEFAULT_TTL)))
            .await;
    }

    pub async fn get_crop(&self, crop: &CropId) -> Option<Crop> {
        self.cache
            .get(&CacheKey::CropDetail(crop.clone()).to_string())
            .await
    }

    pub async fn set_crop(&self, crop: &Crop, ttl: Option<Ttl>) {
        let key = CacheKey::CropDetail(crop.id.clone());
        self.cache
            .set(&key.to_string(), crop, Some(ttl.unwrap_or(Self::DEFAULT_TTL)))
            .await;
    }

    /// Drops one crop together with its plot's crop lists and active-crop
    /// shortcut.
    pub async fn invalidate_crop(&self, crop: &CropId, plot: &PlotId) -> usize {
        invalidate_view(&self.cache, &CacheKey::CropDetail(crop.clone())).await
            + self.invalidate_plot_crops(plot).await
    }

    pub async fn invalidate_plot_crops(&self, plot: &PlotId) -> usize {
        invalidate_view(&self.cache, &CacheKey::CropsByPlot(plot.clone(), Filters::new())).await
            + invalidate_view(&self.cache, &CacheKey::ActiveCrop(plot.clone())).await
    }

    pub async fn invalidate_all(&self) -> usize {
        self.cache.invalidate(Domain::Crops.pattern()).await
    }
}
