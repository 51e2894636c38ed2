// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Fit aggregate queries and identity provider user info.

use crate::error::AppError;
use crate::models::fitness::{CALORIES_EXPENDED, STEP_COUNT_DELTA};
use crate::models::{AggregateRequest, AggregateResponse, FitnessTotals, UserInfo};
use crate::time_utils::QueryWindow;
use serde::de::DeserializeOwned;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Bearer-authorized client for the fitness API.
#[derive(Clone)]
pub struct FitnessClient {
    http: reqwest::Client,
    base_url: String,
    userinfo_url: String,
}

impl FitnessClient {
    /// `base_url` is the `.../users/me` root of the fitness API.
    pub fn new(base_url: &str, userinfo_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            userinfo_url: userinfo_url.to_string(),
        }
    }

    /// Run one `dataset:aggregate` query.
    pub async fn aggregate(
        &self,
        access_token: &str,
        data_type_name: &str,
        window: QueryWindow,
    ) -> Result<AggregateResponse, AppError> {
        let url = format!("{}/dataset:aggregate", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&AggregateRequest::new(data_type_name, window))
            .send()
            .await
            .map_err(|e| AppError::FitnessApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Today's step and calorie totals.
    ///
    /// The calorie query is only issued once the step query succeeded, so an
    /// authorization failure on either leaves nothing half-done to retry.
    pub async fn daily_totals(
        &self,
        access_token: &str,
        window: QueryWindow,
    ) -> Result<FitnessTotals, AppError> {
        let steps = self.aggregate(access_token, STEP_COUNT_DELTA, window).await?;
        let calories = self.aggregate(access_token, CALORIES_EXPENDED, window).await?;
        Ok(FitnessTotals::from_responses(&steps, &calories))
    }

    /// Profile of the token's owner.
    pub async fn user_info(&self, access_token: &str) -> Result<UserInfo, AppError> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::FitnessApi(format!("user info request failed: {}", e)))?;

        self.check_response_json(response).await
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        let status = response.status();

        if status.as_u16() == 401 {
            return Err(AppError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::FitnessApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::FitnessApi(format!("JSON parse error: {}", e)))
    }
}
