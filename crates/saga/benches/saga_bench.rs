use std::sync::Arc;

use booking_saga::{
    Booking, BookingStore, Collaborators, CommandRegistry, InMemoryBookingStore, NewBooking,
    SagaConfig, SagaOrchestrator, Step,
};
use criterion::{Criterion, criterion_group, criterion_main};
use saga_common::{
    BookingId, PaymentDetails, PaymentMethodType, TransactionResult, TransactionStatus,
};

fn request(amount: f64) -> NewBooking {
    NewBooking {
        passenger_name: "John Doe".to_string(),
        flight_number: "FL002".to_string(),
        seat_number: "1A".to_string(),
        payment_details: PaymentDetails::new(amount, "USD", PaymentMethodType::CreditCard),
    }
}

fn orchestrator(store: Arc<InMemoryBookingStore>) -> SagaOrchestrator {
    SagaOrchestrator::new(
        store,
        Collaborators::in_memory(),
        CommandRegistry::with_defaults(),
        SagaConfig::default(),
    )
    .unwrap()
}

async fn run_saga(amount: f64) {
    let store = Arc::new(InMemoryBookingStore::new());
    let orchestrator = orchestrator(store.clone());
    let request = request(amount);
    let booking = Booking::from_request(BookingId::new(), &request);
    let id = booking.id();
    store.insert(booking).await.unwrap();
    let _ = orchestrator
        .process_booking(id, request.payment_details)
        .await;
}

fn bench_saga_happy_path(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("saga/happy_path", |b| {
        b.iter(|| rt.block_on(run_saga(100.0)));
    });
}

fn bench_saga_payment_failure_with_compensation(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("saga/payment_failure_compensated", |b| {
        b.iter(|| rt.block_on(run_saga(5000.0)));
    });
}

fn bench_cancel_completed_booking(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("saga/cancel_completed", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = Arc::new(InMemoryBookingStore::new());
                let orchestrator = orchestrator(store.clone());
                let request = request(100.0);
                let booking = Booking::from_request(BookingId::new(), &request);
                let id = booking.id();
                store.insert(booking).await.unwrap();
                orchestrator
                    .process_booking(id, request.payment_details)
                    .await
                    .unwrap();
                orchestrator.cancel_booking(id).await.unwrap();
                orchestrator.shutdown().await;
            });
        });
    });
}

fn bench_ledger_append_step(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryBookingStore::new();
    let booking = Booking::new(BookingId::new(), "John Doe", "FL001", "1A");
    let id = booking.id();
    rt.block_on(store.insert(booking)).unwrap();
    let result = TransactionResult::success(id.to_string(), TransactionStatus::Completed, "ok");

    c.bench_function("ledger/append_step", |b| {
        b.iter(|| {
            rt.block_on(async {
                store
                    .append_step(id, Step::from_result("seat_service", "block_seat", &result))
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_saga_happy_path,
    bench_saga_payment_failure_with_compensation,
    bench_cancel_completed_booking,
    bench_ledger_append_step,
);
criterion_main!(benches);
