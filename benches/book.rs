use criterion::{black_box, criterion_group, criterion_main, Criterion};

use bookview::engine::{AddOrder, BookView, Message, OrderExecuted, Side, UpdateOrder};

// Deterministic add/update/execute churn over a handful of prices
fn churn(n: u64) -> Vec<Message> {
    let mut msgs = Vec::with_capacity(n as usize * 3);
    let mut seq = 0u32;
    for id in 0..n {
        let side = if id % 2 == 0 { Side::BUY } else { Side::SELL };
        let base = if side == Side::BUY { 1_000 } else { 1_010 };
        let price = base + (id % 16) as i64 * if side == Side::BUY { -1 } else { 1 };
        seq += 1;
        msgs.push(Message::Add(AddOrder { seq, symbol: "VC0".into(), order_id: id, side, size: 100, price }));
        seq += 1;
        msgs.push(Message::Update(UpdateOrder { seq, symbol: "VC0".into(), order_id: id, side, size: 60, price }));
        seq += 1;
        msgs.push(Message::Executed(OrderExecuted { seq, symbol: "VC0".into(), order_id: id, side, traded_quantity: 60 }));
    }
    msgs
}

fn bench_book_view(c: &mut Criterion) {
    let msgs = churn(10_000);
    c.bench_function("book_view_churn_top5", |b| {
        b.iter(|| {
            let mut view = BookView::new(5);
            let mut emitted = 0usize;
            for msg in &msgs {
                if view.process(msg).unwrap().is_some() {
                    emitted += 1;
                }
            }
            black_box(emitted)
        })
    });
}

criterion_group!(benches, bench_book_view);
criterion_main!(benches);
