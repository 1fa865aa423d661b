use binance_connect::exchanges::binance::types::{
    NewOrderRequest as SpotOrderRequest, OrderBookRequest, OrderIdRequest,
};
use binance_connect::exchanges::binance_perp::types::NewOrderRequest;
use binance_connect::{BinanceApi, ClientConfig, ExchangeError, OrderSide, OrderType, TimeInForce};
use mockito::{Matcher, Server};
use rust_decimal::Decimal;
use std::str::FromStr;

const ORDER_RESPONSE: &str = r#"{
    "clientOrderId": "x-1",
    "orderId": 4611875134427365377,
    "symbol": "BTCUSDT",
    "side": "SELL",
    "positionSide": "BOTH",
    "type": "LIMIT",
    "status": "NEW",
    "price": "30000",
    "origQty": "0.010",
    "executedQty": "0",
    "avgPrice": "0.00",
    "timeInForce": "GTC",
    "reduceOnly": true,
    "updateTime": 1566818724722
}"#;

fn public_api(server: &Server) -> BinanceApi {
    let config = ClientConfig::read_only()
        .base_url(server.url())
        .futures_base_url(server.url());
    BinanceApi::new(config).unwrap()
}

fn signed_api(server: &Server) -> BinanceApi {
    let config = ClientConfig::new("test-key".to_string(), "test-secret".to_string())
        .base_url(server.url())
        .futures_base_url(server.url())
        .recv_window(5000);
    BinanceApi::new(config).unwrap()
}

#[tokio::test]
async fn order_book_sends_only_the_symbol() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/fapi/v1/depth")
        .match_query(Matcher::Exact("symbol=BTCUSDT".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"lastUpdateId":1027024,"E":1589436922972,"T":1589436922959,
                "bids":[["4.00000000","431.00000000"]],"asks":[["4.00000200","12.00000000"]]}"#,
        )
        .create_async()
        .await;

    let api = public_api(&server);
    let book = api
        .futures
        .market
        .get_order_book(&OrderBookRequest::new("BTCUSDT"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(book.last_update_id, 1_027_024);
    assert_eq!(book.event_time, Some(1_589_436_922_972));
    assert_eq!(
        book.bids[0],
        (Decimal::from_str("4.00000000").unwrap(), Decimal::from(431))
    );
}

#[tokio::test]
async fn missing_required_field_makes_no_request() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let api = public_api(&server);
    let err = api
        .futures
        .market
        .get_order_book(&OrderBookRequest::default())
        .await
        .unwrap_err();

    match err {
        ExchangeError::Validation { fields } => assert_eq!(fields, vec!["symbol".to_string()]),
        other => panic!("unexpected error: {other:?}"),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn limit_order_names_every_missing_field() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let api = signed_api(&server);
    let err = api
        .futures
        .trade
        .new_limit_order(&NewOrderRequest::new("BTCUSDT", OrderSide::Buy, OrderType::Limit))
        .await
        .unwrap_err();

    match err {
        ExchangeError::Validation { fields } => {
            assert_eq!(fields, vec!["timeInForce", "quantity", "price"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    mock.assert_async().await;
}

fn missing_fields(err: ExchangeError) -> Vec<String> {
    match err {
        ExchangeError::Validation { fields } => fields,
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn market_order_without_quantity_makes_no_request() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let api = signed_api(&server);
    let futures = api
        .futures
        .trade
        .new_market_order(&NewOrderRequest::new("BTCUSDT", OrderSide::Buy, OrderType::Market))
        .await
        .unwrap_err();
    assert_eq!(missing_fields(futures), vec!["quantity"]);

    let spot = api
        .spot
        .trade
        .new_market_order(&SpotOrderRequest::new("BTCUSDT", OrderSide::Buy, OrderType::Market))
        .await
        .unwrap_err();
    assert_eq!(missing_fields(spot), vec!["quantity/quoteOrderQty"]);

    mock.assert_async().await;
}

#[tokio::test]
async fn empty_order_reports_base_and_type_fields_together() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let api = signed_api(&server);
    let futures = api
        .futures
        .trade
        .new_market_order(&NewOrderRequest::default())
        .await
        .unwrap_err();
    assert_eq!(missing_fields(futures), vec!["symbol", "side", "quantity"]);

    let spot = api
        .spot
        .trade
        .new_limit_order(&SpotOrderRequest::default())
        .await
        .unwrap_err();
    assert_eq!(
        missing_fields(spot),
        vec!["symbol", "side", "timeInForce", "quantity", "price"]
    );

    mock.assert_async().await;
}

#[tokio::test]
async fn private_call_without_credentials_fails_before_io() {
    let mut server = Server::new_async().await;
    let private = server
        .mock("GET", "/fapi/v2/balance")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let ping = server
        .mock("GET", "/fapi/v1/ping")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let api = public_api(&server);
    let err = api.futures.trade.get_account_balance().await.unwrap_err();
    assert!(err.is_configuration());

    api.futures.market.test_connectivity().await.unwrap();

    private.assert_async().await;
    ping.assert_async().await;
}

#[tokio::test]
async fn exchange_error_is_normalized() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/fapi/v1/depth")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(r#"{"code":-1121,"msg":"Invalid symbol."}"#)
        .create_async()
        .await;

    let api = public_api(&server);
    let err = api
        .futures
        .market
        .get_order_book(&OrderBookRequest::new("NOPE"))
        .await
        .unwrap_err();

    assert_eq!(err.code(), Some(-1121));
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.to_string(), "Request failed: Invalid symbol.");
}

#[tokio::test]
async fn error_without_body_falls_back_to_generic_message() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/v3/ping")
        .with_status(503)
        .create_async()
        .await;

    let api = public_api(&server);
    let err = api.spot.market.test_connectivity().await.unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert_eq!(err.code(), None);
    assert_eq!(err.to_string(), "Request failed: Unknown error");
}

#[tokio::test]
async fn signed_order_is_sent_as_signed_form_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/fapi/v1/order")
        .match_header("x-mbx-apikey", "test-key")
        .match_header("content-type", "application/x-www-form-urlencoded")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("symbol=BTCUSDT".to_string()),
            Matcher::Regex("type=LIMIT".to_string()),
            Matcher::Regex("quantity=0.010".to_string()),
            Matcher::Regex("reduceOnly=true".to_string()),
            Matcher::Regex(r"recvWindow=5000&timestamp=\d{13}&signature=[0-9a-f]{64}$".to_string()),
        ]))
        .with_status(200)
        .with_body(ORDER_RESPONSE)
        .create_async()
        .await;

    let api = signed_api(&server);
    let order = NewOrderRequest::new("BTCUSDT", OrderSide::Sell, OrderType::Limit)
        .quantity(Decimal::from_str("0.010").unwrap())
        .price(Decimal::from(30_000))
        .time_in_force(TimeInForce::Gtc)
        .reduce_only(true);
    let response = api.futures.trade.new_limit_order(&order).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.order_id, 4_611_875_134_427_365_377);
    assert_eq!(response.reduce_only, Some(true));
}

#[tokio::test]
async fn signed_query_goes_in_the_url() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v3/order")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("symbol".to_string(), "BNBUSDT".to_string()),
            Matcher::UrlEncoded("orderId".to_string(), "42".to_string()),
            Matcher::Regex(r"signature=[0-9a-f]{64}$".to_string()),
        ]))
        .with_status(200)
        .with_body(r#"{"symbol":"BNBUSDT","orderId":42}"#)
        .create_async()
        .await;

    let api = signed_api(&server);
    let order = api
        .spot
        .trade
        .query_order(&OrderIdRequest::by_id("BNBUSDT", 42))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(order["orderId"], 42);
}

#[tokio::test]
async fn listen_key_uses_api_key_without_signature() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/fapi/v1/listenKey")
        .match_header("x-mbx-apikey", "test-key")
        .match_body(Matcher::Exact(String::new()))
        .with_status(200)
        .with_body(r#"{"listenKey":"pqia91ma19a5s61cv6a81va65sdf19v8a65a1a5s61cv6a81va65sdf19v8a65a1"}"#)
        .create_async()
        .await;

    let api = signed_api(&server);
    let key = api.futures.data_stream.create_listen_key().await.unwrap();

    mock.assert_async().await;
    assert!(key.listen_key.starts_with("pqia91ma"));
}

#[tokio::test]
async fn oversized_batch_is_rejected_locally() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/fapi/v1/batchOrders")
        .expect(0)
        .create_async()
        .await;

    let api = signed_api(&server);
    let order = NewOrderRequest::new("BTCUSDT", OrderSide::Buy, OrderType::Market)
        .quantity(Decimal::ONE);
    let err = api
        .futures
        .trade
        .place_multiple_orders(&vec![order; 6])
        .await
        .unwrap_err();

    assert!(matches!(err, ExchangeError::InvalidParameters(_)));
    mock.assert_async().await;
}
