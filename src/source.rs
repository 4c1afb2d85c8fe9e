//! Data-source seam between the stores and the network.
//!
//! Stores receive their source through their constructor, so tests and
//! offline tools can hand them anything that answers these three calls.

use std::sync::Arc;

use crate::api::Client;
use crate::error::ApiError;
use crate::models::{AdminLevel, ApiResponse, GeoJsonData, MapDataParams, MapDataPayload, Theme};

pub trait CensusSource {
    fn geojson(&self, level: AdminLevel) -> Result<ApiResponse<GeoJsonData>, ApiError>;

    fn map_data(
        &self,
        indicator_code: &str,
        params: &MapDataParams,
    ) -> Result<ApiResponse<MapDataPayload>, ApiError>;

    fn themes(&self) -> Result<ApiResponse<Vec<Theme>>, ApiError>;
}

impl CensusSource for Client {
    fn geojson(&self, level: AdminLevel) -> Result<ApiResponse<GeoJsonData>, ApiError> {
        Client::geojson(self, level)
    }

    fn map_data(
        &self,
        indicator_code: &str,
        params: &MapDataParams,
    ) -> Result<ApiResponse<MapDataPayload>, ApiError> {
        Client::map_data(self, indicator_code, params)
    }

    fn themes(&self) -> Result<ApiResponse<Vec<Theme>>, ApiError> {
        Client::themes(self)
    }
}

impl<S: CensusSource + ?Sized> CensusSource for &S {
    fn geojson(&self, level: AdminLevel) -> Result<ApiResponse<GeoJsonData>, ApiError> {
        (**self).geojson(level)
    }

    fn map_data(
        &self,
        indicator_code: &str,
        params: &MapDataParams,
    ) -> Result<ApiResponse<MapDataPayload>, ApiError> {
        (**self).map_data(indicator_code, params)
    }

    fn themes(&self) -> Result<ApiResponse<Vec<Theme>>, ApiError> {
        (**self).themes()
    }
}

impl<S: CensusSource + ?Sized> CensusSource for Arc<S> {
    fn geojson(&self, level: AdminLevel) -> Result<ApiResponse<GeoJsonData>, ApiError> {
        (**self).geojson(level)
    }

    fn map_data(
        &self,
        indicator_code: &str,
        params: &MapDataParams,
    ) -> Result<ApiResponse<MapDataPayload>, ApiError> {
        (**self).map_data(indicator_code, params)
    }

    fn themes(&self) -> Result<ApiResponse<Vec<Theme>>, ApiError> {
        (**self).themes()
    }
}
