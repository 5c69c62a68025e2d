// Booking wizard: Details -> Payment -> Confirmed
// Payment is the only await point; at most one completion runs per draft

use crate::auth::InFlightGuard;
use crate::catalog::{Catalog, CatalogItem, CatalogKind};
use crate::config::{AppConfig, LatencyConfig, PricingConfig, WizardConfig};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PaymentError {
    #[error("Payment declined: {0}")]
    Declined(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WizardError {
    #[error("{kind} {id} not found")]
    ItemNotFound { kind: CatalogKind, id: String },

    #[error("Payment step is finished by completing the booking")]
    CompletionRequired,

    #[error("Cannot skip from {from} to {to}")]
    StepSkipped { from: WizardStep, to: WizardStep },

    #[error("Booking is already confirmed")]
    AlreadyConfirmed,

    #[error("Booking completion already in progress")]
    CompletionInFlight,

    #[error("Missing booking details: {0}")]
    MissingDetails(String),

    #[error("Unknown payment method: {0}")]
    UnknownPaymentMethod(String),

    #[error(transparent)]
    Payment(#[from] PaymentError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WizardStep {
    Details = 1,
    Payment = 2,
    Confirmed = 3,
}

impl WizardStep {
    // Missing or malformed values mean Details
    pub fn from_param(param: Option<&str>) -> Self {
        match param.map(str::trim).and_then(|p| p.parse::<u8>().ok()) {
            Some(2) => WizardStep::Payment,
            Some(3) => WizardStep::Confirmed,
            _ => WizardStep::Details,
        }
    }

    pub fn number(&self) -> u8 {
        *self as u8
    }

    pub fn title(&self) -> &'static str {
        match self {
            WizardStep::Details => "Booking Details",
            WizardStep::Payment => "Payment & Contact",
            WizardStep::Confirmed => "Booking Confirmed",
        }
    }

    fn next(&self) -> Option<Self> {
        match self {
            WizardStep::Details => Some(WizardStep::Payment),
            WizardStep::Payment => Some(WizardStep::Confirmed),
            WizardStep::Confirmed => None,
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} ({})", self.number(), self.title())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Razorpay,
    Stripe,
}

impl PaymentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Razorpay => "Razorpay (Cards, UPI, Net Banking)",
            PaymentMethod::Stripe => "International Cards (Stripe)",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = WizardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "razorpay" => Ok(PaymentMethod::Razorpay),
            "stripe" => Ok(PaymentMethod::Stripe),
            other => Err(WizardError::UnknownPaymentMethod(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingDraft {
    pub kind: CatalogKind,
    pub item_id: String,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guests: u8,
    pub special_requests: String,
    pub contact: ContactInfo,
    pub payment_method: PaymentMethod,
    pub step: WizardStep,
}

impl BookingDraft {
    fn new(kind: CatalogKind, item_id: &str) -> Self {
        Self {
            kind,
            item_id: item_id.to_string(),
            check_in: None,
            check_out: None,
            guests: 2,
            special_requests: String::new(),
            contact: ContactInfo::default(),
            payment_method: PaymentMethod::default(),
            step: WizardStep::Details,
        }
    }
}

// Amounts are widened to u64 so a stay on a large nightly price cannot overflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceBreakdown {
    pub subtotal: u64,
    pub tax: u64,
    pub total: u64,
    pub basis: String,
}

// Hotels are charged for a fixed stay; every other kind is charged its listed price once
pub fn price_breakdown(item: &CatalogItem, pricing: &PricingConfig) -> PriceBreakdown {
    let amount = u64::from(item.price().amount);
    let (subtotal, basis) = match item.kind() {
        CatalogKind::Hotel => (
            amount * u64::from(pricing.hotel_nights),
            format!("Per night × {} nights", pricing.hotel_nights),
        ),
        CatalogKind::Guide => (amount, "Per day".to_string()),
        CatalogKind::Destination | CatalogKind::Vendor => (amount, "Total price".to_string()),
    };
    let tax = (subtotal as f64 * pricing.tax_rate).round() as u64;

    PriceBreakdown {
        subtotal,
        tax,
        total: subtotal.saturating_add(tax),
        basis,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub amount: u64,
    pub currency: String,
    pub method: PaymentMethod,
    pub payer_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub reference: String,
    pub paid_at: DateTime<Utc>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    async fn charge(&self, request: &PaymentRequest) -> Result<PaymentReceipt, PaymentError>;
}

// Waits the configured latency and accepts every charge
pub struct SimulatedPaymentGateway {
    latency: Duration,
}

impl SimulatedPaymentGateway {
    pub fn new(latency: &LatencyConfig) -> Self {
        Self {
            latency: latency.payment(),
        }
    }
}

#[async_trait]
impl PaymentGateway for SimulatedPaymentGateway {
    async fn charge(&self, request: &PaymentRequest) -> Result<PaymentReceipt, PaymentError> {
        debug!(
            "Simulating {} charge of {} {}",
            request.method.label(),
            request.amount,
            request.currency
        );
        sleep(self.latency).await;

        let paid_at = Utc::now();
        Ok(PaymentReceipt {
            reference: format!("pay_{}", paid_at.timestamp_millis()),
            paid_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingConfirmation {
    pub booking_id: String,
    pub kind: CatalogKind,
    pub item_name: String,
    pub item_location: String,
    pub contact_email: String,
    pub guests: u8,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub payment_method: PaymentMethod,
    pub payment_reference: String,
    pub price: PriceBreakdown,
    pub confirmed_at: DateTime<Utc>,
}

// "JH" plus the last six digits of the confirmation timestamp in millis
fn booking_id(confirmed_at: &DateTime<Utc>) -> String {
    format!("JH{:06}", confirmed_at.timestamp_millis().rem_euclid(1_000_000))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardNav {
    Step(WizardStep),
    // Leave the flow for the referring page
    Exit { to: String },
}

pub struct BookingWizard {
    item: CatalogItem,
    gateway: Arc<dyn PaymentGateway>,
    pricing: PricingConfig,
    settings: WizardConfig,
    draft: Mutex<BookingDraft>,
    confirmation: Mutex<Option<BookingConfirmation>>,
    completing: AtomicBool,
}

impl BookingWizard {
    pub fn start(
        catalog: &Catalog,
        kind: CatalogKind,
        id: &str,
        step_param: Option<&str>,
        gateway: Arc<dyn PaymentGateway>,
        config: &AppConfig,
    ) -> Result<Self, WizardError> {
        let item = catalog.find(kind, id).cloned().ok_or_else(|| {
            warn!("Booking requested for missing {} {}", kind, id);
            WizardError::ItemNotFound {
                kind,
                id: id.to_string(),
            }
        })?;

        // A fresh draft has nothing to show past Details
        let requested = WizardStep::from_param(step_param);
        if requested != WizardStep::Details {
            debug!("Ignoring {} for a new {} {} booking", requested, kind, id);
        }

        info!("Started booking for {} {}", kind, id);
        Ok(Self {
            item,
            gateway,
            pricing: config.pricing.clone(),
            settings: config.wizard.clone(),
            draft: Mutex::new(BookingDraft::new(kind, id)),
            confirmation: Mutex::new(None),
            completing: AtomicBool::new(false),
        })
    }

    pub fn item(&self) -> &CatalogItem {
        &self.item
    }

    pub fn draft(&self) -> BookingDraft {
        self.draft.lock().clone()
    }

    pub fn step(&self) -> WizardStep {
        self.draft.lock().step
    }

    pub fn is_completing(&self) -> bool {
        self.completing.load(Ordering::Acquire)
    }

    pub fn confirmation(&self) -> Option<BookingConfirmation> {
        self.confirmation.lock().clone()
    }

    // Recomputed on every call
    pub fn price_breakdown(&self) -> PriceBreakdown {
        price_breakdown(&self.item, &self.pricing)
    }

    pub fn href(&self, step: WizardStep) -> String {
        let draft = self.draft.lock();
        format!("/book/{}/{}?step={}", draft.kind, draft.item_id, step.number())
    }

    // The draft is frozen from the moment a completion starts.
    // The flag is checked under the draft lock; `complete` raises it before taking its snapshot.
    fn editable(&self) -> Result<MutexGuard<'_, BookingDraft>, WizardError> {
        let draft = self.draft.lock();
        if self.is_completing() {
            return Err(WizardError::CompletionInFlight);
        }
        Ok(draft)
    }

    pub fn set_dates(
        &self,
        check_in: Option<NaiveDate>,
        check_out: Option<NaiveDate>,
    ) -> Result<(), WizardError> {
        let mut draft = self.editable()?;
        draft.check_in = check_in;
        draft.check_out = check_out;
        Ok(())
    }

    // Clamped to 1..=max_guests
    pub fn set_guests(&self, guests: u8) -> Result<(), WizardError> {
        self.editable()?.guests = guests.clamp(1, self.settings.max_guests.max(1));
        Ok(())
    }

    pub fn set_special_requests(&self, requests: impl Into<String>) -> Result<(), WizardError> {
        self.editable()?.special_requests = requests.into();
        Ok(())
    }

    pub fn set_contact(&self, contact: ContactInfo) -> Result<(), WizardError> {
        self.editable()?.contact = contact;
        Ok(())
    }

    pub fn set_payment_method(&self, method: PaymentMethod) -> Result<(), WizardError> {
        self.editable()?.payment_method = method;
        Ok(())
    }

    // Details -> Payment. Payment only moves on through `complete`.
    pub fn advance(&self) -> Result<WizardStep, WizardError> {
        let mut draft = self.editable()?;
        match draft.step {
            WizardStep::Details => {
                if self.settings.require_details {
                    check_details(&draft)?;
                }
                draft.step = WizardStep::Payment;
                info!("Booking {} {} moved to {}", draft.kind, draft.item_id, draft.step);
                Ok(draft.step)
            }
            WizardStep::Payment => Err(WizardError::CompletionRequired),
            WizardStep::Confirmed => Err(WizardError::AlreadyConfirmed),
        }
    }

    // Payment -> Details keeps every field; Details leaves the flow
    pub fn back(&self) -> Result<WizardNav, WizardError> {
        let mut draft = self.editable()?;
        match draft.step {
            WizardStep::Payment => {
                draft.step = WizardStep::Details;
                Ok(WizardNav::Step(WizardStep::Details))
            }
            WizardStep::Details | WizardStep::Confirmed => Ok(WizardNav::Exit {
                to: self.item.detail_path(),
            }),
        }
    }

    // Used when the step parameter changes under a live draft
    pub fn navigate_to(&self, target: WizardStep) -> Result<WizardStep, WizardError> {
        let mut draft = self.editable()?;
        let current = draft.step;
        if current == WizardStep::Confirmed {
            return if target == WizardStep::Confirmed {
                Ok(current)
            } else {
                Err(WizardError::AlreadyConfirmed)
            };
        }

        if target <= current {
            draft.step = target;
            return Ok(target);
        }

        match current.next() {
            Some(next) if next == target => match target {
                WizardStep::Confirmed => Err(WizardError::CompletionRequired),
                _ => {
                    drop(draft);
                    self.advance()
                }
            },
            _ => Err(WizardError::StepSkipped {
                from: current,
                to: target,
            }),
        }
    }

    // Payment -> Confirmed through the gateway; a second call while one is pending is rejected
    pub async fn complete(&self) -> Result<BookingConfirmation, WizardError> {
        let _guard = InFlightGuard::acquire(&self.completing).ok_or(WizardError::CompletionInFlight)?;

        // Everything reported back comes from this snapshot, never from the live draft
        let (snapshot, request, price) = {
            let draft = self.draft.lock();
            match draft.step {
                WizardStep::Payment => {}
                WizardStep::Confirmed => return Err(WizardError::AlreadyConfirmed),
                WizardStep::Details => {
                    return Err(WizardError::StepSkipped {
                        from: WizardStep::Details,
                        to: WizardStep::Confirmed,
                    })
                }
            }
            let price = self.price_breakdown();
            let request = PaymentRequest {
                amount: price.total,
                currency: self.pricing.currency.clone(),
                method: draft.payment_method,
                payer_email: draft.contact.email.clone(),
            };
            (draft.clone(), request, price)
        };

        let receipt = match self.gateway.charge(&request).await {
            Ok(receipt) => receipt,
            Err(e) => {
                error!("Payment failed: {:?}", e);
                return Err(e.into());
            }
        };

        let confirmation = BookingConfirmation {
            booking_id: booking_id(&receipt.paid_at),
            kind: snapshot.kind,
            item_name: self.item.name().to_string(),
            item_location: self.item.location().to_string(),
            contact_email: request.payer_email,
            guests: snapshot.guests,
            check_in: snapshot.check_in,
            check_out: snapshot.check_out,
            payment_method: request.method,
            payment_reference: receipt.reference,
            price,
            confirmed_at: receipt.paid_at,
        };
        self.draft.lock().step = WizardStep::Confirmed;
        *self.confirmation.lock() = Some(confirmation.clone());

        info!(
            "Booking {} confirmed for {} {}, total {}",
            confirmation.booking_id, snapshot.kind, snapshot.item_id, confirmation.price.total
        );
        Ok(confirmation)
    }
}

fn check_details(draft: &BookingDraft) -> Result<(), WizardError> {
    match (draft.check_in, draft.check_out) {
        (Some(check_in), Some(check_out)) if check_out > check_in => Ok(()),
        (Some(_), Some(_)) => Err(WizardError::MissingDetails(
            "check-out must be after check-in".to_string(),
        )),
        _ => Err(WizardError::MissingDetails(
            "check-in and check-out dates are required".to_string(),
        )),
    }
}
