//! 모의 주문.
//!
//! 실제 주문 실행은 지원하지 않습니다. [`OrderTicket`]은 입력을 검증한 뒤
//! 접수 확인만 돌려줍니다.

mod order_ticket;

pub use order_ticket::{OrderContext, OrderTicket, SimulatedOrder};
