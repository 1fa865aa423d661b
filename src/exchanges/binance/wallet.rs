use crate::core::errors::ExchangeError;
use crate::core::kernel::{Params, RestClient};
use crate::exchanges::binance::types::{
    AssetRequest, AssetValuationRequest, DepositAddressRequest, DepositHistoryRequest,
    SymbolRequest, WithdrawHistoryRequest, WithdrawRequest,
};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// Wallet endpoints (`/sapi`). Signed, except the system status probe.
pub struct SpotWalletApi<R: RestClient> {
    rest: Arc<R>,
}

impl<R: RestClient> SpotWalletApi<R> {
    pub fn new(rest: Arc<R>) -> Self {
        Self { rest }
    }

    async fn signed(
        &self,
        method: Method,
        path: &'static str,
        params: Params,
    ) -> Result<Value, ExchangeError> {
        self.rest.private_request(method, path, params).await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_system_status(&self) -> Result<Value, ExchangeError> {
        self.rest
            .public_request(Method::GET, "/sapi/v1/system/status", Params::new())
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_all_coins_information(&self) -> Result<Value, ExchangeError> {
        self.signed(Method::GET, "/sapi/v1/capital/config/getall", Params::new())
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_deposit_history(
        &self,
        request: &DepositHistoryRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::from_serializable(request)?;
        self.signed(Method::GET, "/sapi/v1/capital/deposit/hisrec", params)
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_withdraw_history(
        &self,
        request: &WithdrawHistoryRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::from_serializable(request)?;
        self.signed(Method::GET, "/sapi/v1/capital/withdraw/history", params)
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance", coin = ?request.coin))]
    pub async fn withdraw(&self, request: &WithdrawRequest) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["coin", "address", "amount"])?;
        self.signed(Method::POST, "/sapi/v1/capital/withdraw/apply", params)
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_deposit_address(
        &self,
        request: &DepositAddressRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["coin"])?;
        self.signed(Method::GET, "/sapi/v1/capital/deposit/address", params)
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_account_status(&self) -> Result<Value, ExchangeError> {
        self.signed(Method::GET, "/sapi/v1/account/status", Params::new())
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_api_trading_status(&self) -> Result<Value, ExchangeError> {
        self.signed(Method::GET, "/sapi/v1/account/apiTradingStatus", Params::new())
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_asset_detail(&self, request: &AssetRequest) -> Result<Value, ExchangeError> {
        let params = Params::from_serializable(request)?;
        self.signed(Method::GET, "/sapi/v1/asset/assetDetail", params)
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_trade_fee(&self, request: &SymbolRequest) -> Result<Value, ExchangeError> {
        let params = Params::from_serializable(request)?;
        self.signed(Method::GET, "/sapi/v1/asset/tradeFee", params)
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_funding_wallet(
        &self,
        request: &AssetValuationRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::from_serializable(request)?;
        self.signed(Method::POST, "/sapi/v1/asset/get-funding-asset", params)
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_user_asset(
        &self,
        request: &AssetValuationRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::from_serializable(request)?;
        self.signed(Method::POST, "/sapi/v3/asset/getUserAsset", params)
            .await
    }
}
