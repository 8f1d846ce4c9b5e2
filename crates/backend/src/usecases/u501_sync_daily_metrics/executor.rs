use anyhow::Result;
use chrono::NaiveDate;
use contracts::domain::a001_brand::aggregate::Brand;
use contracts::domain::a002_platform_connection::aggregate::{PlatformConnection, PlatformType};
use contracts::usecases::u501_sync_daily_metrics::{SyncRequest, SyncResponse, WindowOutcome};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::a001_brand;
use crate::domain::a002_platform_connection::service::{self as credentials_service, BrandCredentials};
use crate::domain::a003_daily_metrics;
use crate::shared::config::PipelineConfig;
use crate::shared::http::ApiError;
use crate::shared::logger::LoggerRegistry;
use crate::shared::notify::{NotificationChannel, SyncNotification};
use crate::usecases::u502_import_from_shopify::processors::daily::{self, CommerceDaily};
use crate::usecases::u502_import_from_shopify::processors::refund;
use crate::usecases::u502_import_from_shopify::reader::OrderReader;
use crate::usecases::u502_import_from_shopify::shopify_api_client::ShopifyApiClient;
use crate::usecases::u503_import_from_meta::meta_api_client::{MetaApiClient, MetaDaily};
use crate::usecases::u504_import_from_google::google_ads_client::{GoogleAdsClient, GoogleDaily};

use super::chunker::{self, DateWindow};
use super::merge::{self, SourcePartials, SyncMode};

/// Executor UseCase синхронизации дневных метрик.
///
/// Разбивает диапазон на чанки и окна, опрашивает три источника с
/// ограниченной конкурентностью и сводит их дневные агрегаты в записи
/// a003_daily_metrics. Прогон best-effort: отказ источника или окна
/// деградирует локально и попадает в итог, не прерывая остальные окна.
pub struct SyncExecutor {
    config: PipelineConfig,
    shopify_client: Arc<ShopifyApiClient>,
    meta_client: Arc<MetaApiClient>,
    google_client: Arc<GoogleAdsClient>,
    notifier: Arc<dyn NotificationChannel>,
    debug_logs: Arc<LoggerRegistry>,
}

struct WindowResult {
    outcome: WindowOutcome,
    partials: SourcePartials,
}

impl SyncExecutor {
    pub fn new(
        config: PipelineConfig,
        notifier: Arc<dyn NotificationChannel>,
        debug_logs: Arc<LoggerRegistry>,
    ) -> Self {
        Self {
            shopify_client: Arc::new(ShopifyApiClient::new(&config.retry)),
            meta_client: Arc::new(MetaApiClient::new(&config.retry)),
            google_client: Arc::new(GoogleAdsClient::new(&config.retry)),
            config,
            notifier,
            debug_logs,
        }
    }

    /// Запустить прогон. Вызывающая сторона всегда получает SyncResponse:
    /// наружу не выходит ни одна ошибка, кроме как полем message.
    pub async fn run(&self, request: SyncRequest) -> SyncResponse {
        match self.run_inner(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Sync failed for brand {}: {:#}", request.brand_id, e);
                let response = SyncResponse::failure(format!("Sync failed: {}", e));
                self.notifier
                    .publish(SyncNotification {
                        success: false,
                        message: response.message.clone(),
                        brand_id: request.brand_id.clone(),
                        user_id: String::new(),
                    })
                    .await;
                response
            }
        }
    }

    async fn run_inner(&self, request: &SyncRequest) -> Result<SyncResponse> {
        request.validate().map_err(|e| anyhow::anyhow!(e))?;

        // Предусловия: бренд и подключение магазина обязательны,
        // их отсутствие фатально для всего прогона
        let brand_uuid = Uuid::parse_str(&request.brand_id)
            .map_err(|_| anyhow::anyhow!("Invalid brand_id: {}", request.brand_id))?;
        let brand = a001_brand::repository::get_by_id(brand_uuid)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Brand not found: {}", request.brand_id))?;

        let credentials = credentials_service::load_for_brand(&request.brand_id).await?;
        if credentials.shopify.is_none() {
            anyhow::bail!("Brand {} has no commerce platform connection", request.brand_id);
        }

        let end_exclusive = request
            .end_date
            .succ_opt()
            .ok_or_else(|| anyhow::anyhow!("end_date out of calendar range"))?;

        // Режим слияния решается один раз на прогон и передается вниз
        let mode = self.decide_mode(request, end_exclusive).await?;
        tracing::info!(
            "Starting sync for brand {} [{}..{}), mode {:?}",
            request.brand_id,
            request.start_date,
            end_exclusive,
            mode
        );

        let schedule_chunks =
            chunker::split_range(request.start_date, end_exclusive, self.config.schedule_chunk_days);

        let mut outcomes: Vec<WindowOutcome> = Vec::new();
        let mut partials = SourcePartials::default();

        // Чанки верхнего уровня идут последовательно; окна внутри чанка —
        // с ограниченной конкурентностью, завершаются в произвольном порядке
        for chunk in &schedule_chunks {
            let windows =
                chunker::split_range(chunk.start, chunk.end, self.config.order_window_days);
            tracing::info!(
                "Processing chunk {}..{} ({} days, {} windows)",
                chunk.start,
                chunk.end,
                chunk.days(),
                windows.len()
            );
            let mut window_stream = stream::iter(windows)
                .map(|window| self.process_window(&brand, &credentials, mode, window))
                .buffer_unordered(self.config.window_concurrency.max(1));

            while let Some(result) = window_stream.next().await {
                partials.absorb(result.partials);
                outcomes.push(result.outcome);
            }
        }

        let records = match mode {
            SyncMode::Full => merge::merge_full(&request.brand_id, &partials),
            SyncMode::Incremental(source) => {
                let existing = a003_daily_metrics::repository::find_range(
                    &request.brand_id,
                    request.start_date,
                    end_exclusive,
                )
                .await?;
                merge::merge_incremental(&request.brand_id, existing, source, &partials)
            }
        };
        let saved = a003_daily_metrics::repository::bulk_upsert(&records).await?;

        outcomes.sort_by_key(|o| o.window_start);
        let degraded = outcomes.iter().filter(|o| !o.complete).count();
        let message = format!(
            "Processed {} windows ({} degraded), saved {} daily records",
            outcomes.len(),
            degraded,
            saved
        );
        tracing::info!("Sync for brand {} finished: {}", request.brand_id, message);

        self.notifier
            .publish(SyncNotification {
                success: true,
                message: message.clone(),
                brand_id: request.brand_id.clone(),
                user_id: brand.user_id.clone(),
            })
            .await;

        Ok(SyncResponse {
            success: true,
            message,
            total_chunks: Some(outcomes.len()),
            total_saved_entries: Some(saved),
            data: outcomes,
        })
    }

    /// Полный пересчет либо добавление нового источника: инкрементальный
    /// путь выбирается только при наличии уже сохраненных записей
    async fn decide_mode(
        &self,
        request: &SyncRequest,
        end_exclusive: NaiveDate,
    ) -> Result<SyncMode> {
        let Some(source) = request.new_source else {
            return Ok(SyncMode::Full);
        };
        let existing = a003_daily_metrics::repository::find_range(
            &request.brand_id,
            request.start_date,
            end_exclusive,
        )
        .await?;
        if existing.is_empty() {
            tracing::info!(
                "No stored records for brand {} in range, falling back to full recomputation",
                request.brand_id
            );
            Ok(SyncMode::Full)
        } else {
            Ok(SyncMode::Incremental(source))
        }
    }

    /// Обработать одно окно: три источника параллельно, отказ любого
    /// из них дает пустой вклад и запись в деградации окна
    async fn process_window(
        &self,
        brand: &Brand,
        credentials: &BrandCredentials,
        mode: SyncMode,
        window: DateWindow,
    ) -> WindowResult {
        let mut partials = SourcePartials::default();
        let mut degradations: Vec<String> = Vec::new();
        let mut orders_read = 0usize;

        let (meta_result, google_result, commerce_result) = tokio::join!(
            self.fetch_meta(credentials, mode, &window),
            self.fetch_google(credentials, mode, &window),
            self.fetch_commerce(brand, credentials, mode, &window),
        );

        match meta_result {
            Some(Ok(daily)) => partials.meta = daily,
            Some(Err(e)) => {
                tracing::error!(
                    "Meta source failed for window {}..{}: {}",
                    window.start,
                    window.end,
                    e
                );
                degradations.push(format!("meta_ads: {}", e));
            }
            None => {}
        }

        match google_result {
            Some(Ok(daily)) => partials.google = daily,
            Some(Err(e)) => {
                tracing::error!(
                    "Google source failed for window {}..{}: {}",
                    window.start,
                    window.end,
                    e
                );
                degradations.push(format!("google_ads: {}", e));
            }
            None => {}
        }

        match commerce_result {
            Some((daily, read_count, complete)) => {
                partials.commerce = daily;
                orders_read = read_count;
                if !complete {
                    degradations.push("shopify: partial page failure".to_string());
                }
            }
            None => {}
        }

        WindowResult {
            outcome: WindowOutcome {
                window_start: window.start,
                window_end: window.end,
                complete: degradations.is_empty(),
                orders_read,
                degradations,
            },
            partials,
        }
    }

    async fn fetch_meta(
        &self,
        credentials: &BrandCredentials,
        mode: SyncMode,
        window: &DateWindow,
    ) -> Option<Result<BTreeMap<NaiveDate, MetaDaily>, ApiError>> {
        if !mode.includes(PlatformType::MetaAds) {
            return None;
        }
        let connection = credentials.meta_ads.as_ref()?;
        Some(self.meta_client.fetch_daily_insights(connection, window).await)
    }

    async fn fetch_google(
        &self,
        credentials: &BrandCredentials,
        mode: SyncMode,
        window: &DateWindow,
    ) -> Option<Result<BTreeMap<NaiveDate, GoogleDaily>, ApiError>> {
        if !mode.includes(PlatformType::GoogleAds) {
            return None;
        }
        let connection = credentials.google_ads.as_ref()?;
        Some(self.google_client.fetch_daily_metrics(connection, window).await)
    }

    /// Заказы окна: чтение, реконсилиация возвратов, дневные агрегаты.
    /// Возвращает (агрегаты, прочитано заказов, пагинация дочитана).
    async fn fetch_commerce(
        &self,
        brand: &Brand,
        credentials: &BrandCredentials,
        mode: SyncMode,
        window: &DateWindow,
    ) -> Option<(BTreeMap<NaiveDate, CommerceDaily>, usize, bool)> {
        if !mode.includes(PlatformType::Shopify) {
            return None;
        }
        let connection: &PlatformConnection = credentials.shopify.as_ref()?;

        let reader = OrderReader::new(
            self.shopify_client.as_ref(),
            self.config.page_size,
            Duration::from_millis(self.config.page_delay_ms),
        );
        let result = reader.read_orders(connection, window, brand.timezone()).await;

        let brand_id = brand.to_string_id();
        for order in &result.orders {
            // Отладочный лог дня: по нему восстанавливаются решения
            // классификации платежей
            self.debug_logs
                .get_or_create(&order.local_date.format("%Y-%m-%d").to_string())
                .log(&format!(
                    "order {}: gross={:.2} taxes={:.2} refund={:.2} cod={} prepaid={} cancelled={}",
                    order.order_id,
                    order.gross_sales,
                    order.total_taxes,
                    order.refund_amount,
                    order.is_cod,
                    order.is_prepaid,
                    order.cancelled
                ));

            if let Err(e) = refund::reconcile(&brand_id, order).await {
                tracing::error!(
                    "Refund reconciliation failed for order {}: {:#}",
                    order.order_id,
                    e
                );
            }
        }

        let read_count = result.orders.len();
        Some((
            daily::accumulate_daily(&result.orders),
            read_count,
            result.complete,
        ))
    }
}
