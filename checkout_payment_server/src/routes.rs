//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpResponse, Responder};
use checkout_payment_engine::{
    db_types::{Order, OrderId},
    order_objects::OrderResult,
    traits::PaymentGatewayDatabase,
    OrderFlowApi,
};
use log::*;
use xendit_tools::{Invoice, InvoiceItem, InvoiceRequest, XenditApi};

use crate::{
    auth::{JwtClaims, TokenIssuer},
    config::ServerConfig,
    data_objects::{AuthRequest, AuthResponse, CheckoutRequest, CheckoutResponse, OverrideRequest},
    errors::{AuthError, ServerError},
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name);
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Auth  ----------------------------------------------------
route!(auth => Post "/auth");
/// Route handler for the auth endpoint
///
/// Exchanges the long-lived admin API key for a short-lived access token. The operator name in the request is
/// stamped into the token's `sub` claim and follows every manual override into the audit trail, so each operator
/// should authenticate under their own name.
///
/// The token is valid for a relatively short period and will NOT refresh.
pub async fn auth(
    body: web::Json<AuthRequest>,
    signer: web::Data<TokenIssuer>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received auth request");
    let request = body.into_inner();
    if request.api_key.as_bytes() != config.auth.api_key.reveal().as_bytes() {
        debug!("💻️ Rejecting auth request carrying an invalid API key");
        return Err(AuthError::InvalidApiKey.into());
    }
    let token = signer.issue_token(&request.operator)?;
    info!("💻️ Issued access token for operator '{}'", request.operator);
    Ok(HttpResponse::Ok().json(AuthResponse { token }))
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(checkout => Post "/checkout" impl PaymentGatewayDatabase);
/// Route handler for the consumer-facing checkout endpoint.
///
/// Builds an order from the submitted cart, asks the provider for a hosted invoice and links the two. If the
/// provider cannot be reached the order is left in `Pending` without an invoice and the client receives a 502; the
/// checkout can simply be retried.
pub async fn checkout<B: PaymentGatewayDatabase>(
    body: web::Json<CheckoutRequest>,
    api: web::Data<OrderFlowApi<B>>,
    xendit: web::Data<XenditApi>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received checkout request");
    let CheckoutRequest { items, payer_email } = body.into_inner();
    if items.is_empty() {
        return Err(ServerError::InvalidOrder { code: "empty_cart", message: "The cart is empty".into() });
    }
    let order = api.create_order(items, payer_email.clone()).await?;
    let invoice = issue_invoice(&order, payer_email, &xendit, &config).await?;
    let order = api.attach_invoice(&order.id, &invoice.id, &invoice.invoice_url).await?;
    let invoice_url = order.invoice_url.clone().unwrap_or(invoice.invoice_url);
    Ok(HttpResponse::Ok().json(CheckoutResponse {
        order_id: order.id,
        status: order.status,
        total: order.total,
        invoice_url,
    }))
}

async fn issue_invoice(
    order: &Order,
    payer_email: Option<String>,
    xendit: &XenditApi,
    config: &ServerConfig,
) -> Result<Invoice, ServerError> {
    let mut request =
        InvoiceRequest::new(order.external_id.clone(), order.total, format!("Payment for order {}", order.id));
    request.payer_email = payer_email;
    // The order id rides along in the redirect URLs so the storefront can resume polling after the hosted
    // invoice closes.
    request.success_redirect_url =
        Some(format!("{}/checkout/success?order_id={}", config.base_url, order.id.as_str()));
    request.failure_redirect_url =
        Some(format!("{}/checkout/failed?order_id={}", config.base_url, order.id.as_str()));
    request.items = order
        .items()
        .iter()
        .filter(|item| item.price.is_positive())
        .map(|item| InvoiceItem { name: item.name.clone(), quantity: item.qty, price: item.price })
        .collect();
    xendit.create_invoice(request).await.map_err(|e| {
        warn!("💻️ Invoice creation failed for order {}. The order stays Pending and can be retried. {e}", order.id);
        ServerError::from(e)
    })
}

//----------------------------------------------   Status query  ------------------------------------------------
route!(order_status => Get "/checkout/{order_id}" impl PaymentGatewayDatabase);
/// The polling route. A pure read of the current order record, minus the raw provider payload.
pub async fn order_status<B: PaymentGatewayDatabase>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    trace!("💻️ Status query for order {order_id}");
    let order = api.fetch_order(&order_id).await?;
    Ok(HttpResponse::Ok().json(OrderResult::from(order)))
}

//----------------------------------------------   Admin override  ----------------------------------------------
route!(update_order_status => Post "/admin/orders/{order_id}/status" impl PaymentGatewayDatabase);
/// Moves an order to an arbitrary status on behalf of an authenticated operator. Unlike the reconciler, this path
/// may leave terminal states. The operator identity from the access token is written into the audit ledger.
pub async fn update_order_status<B: PaymentGatewayDatabase>(
    claims: JwtClaims,
    path: web::Path<String>,
    body: web::Json<OverrideRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    info!("🛠️ Operator '{}' requests moving order {} to {}", claims.sub, order_id, body.status);
    let order = api.override_order_status(&order_id, body.status, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(OrderResult::from(order)))
}
