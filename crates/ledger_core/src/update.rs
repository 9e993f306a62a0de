use crate::{classify, AddressPhase, CrawlBook, CrawlCursor, DoneReason, Effect, Msg};

/// Pure update function: applies a message to the book and returns the
/// requests to enqueue and the addresses that finished.
pub fn update(mut book: CrawlBook, msg: Msg) -> (CrawlBook, Vec<Effect>) {
    let effects = match msg {
        Msg::AddressesSubmitted(raw) => {
            let mut effects = Vec::new();
            for address in raw.iter().map(|a| a.trim()).filter(|a| !a.is_empty()) {
                if book.phase(address).is_some() {
                    continue;
                }
                let address_type = classify(address);
                if !address_type.is_valid() {
                    book.reject(address);
                    effects.push(Effect::RejectAddress {
                        address: address.to_string(),
                    });
                    continue;
                }
                book.set_phase(address, AddressPhase::Root);
                effects.push(Effect::Enqueue(
                    book.request(CrawlCursor::root(address_type, address)),
                ));
            }
            effects
        }
        Msg::RootFetched { cursor, base } => match book.phase(&cursor.address) {
            Some(AddressPhase::Root) => {
                book.set_base(&cursor.address, base.clone());
                book.set_phase(&cursor.address, AddressPhase::Paging(1));
                vec![Effect::Enqueue(book.request(cursor.first_page(base)))]
            }
            _ => Vec::new(),
        },
        Msg::PageHandled {
            cursor,
            has_more,
            quota_reached,
        } => match book.phase(&cursor.address) {
            Some(AddressPhase::Paging(current)) if current == cursor.page => {
                if has_more && !quota_reached {
                    book.set_phase(&cursor.address, AddressPhase::Paging(current + 1));
                    vec![Effect::Enqueue(book.request(cursor.next_page()))]
                } else {
                    let reason = if quota_reached {
                        DoneReason::QuotaReached
                    } else {
                        DoneReason::LastPage
                    };
                    finish(&mut book, &cursor.address, reason)
                }
            }
            _ => Vec::new(),
        },
        // Out-of-band page: the phase is left alone, so its PageHandled never
        // advances pagination.
        Msg::PageRequested { address, page } => match book.base(&address).cloned() {
            Some(base) if page >= 1 => {
                let cursor = CrawlCursor::transaction_page(classify(&address), &address, base, page);
                vec![Effect::Enqueue(book.request(cursor))]
            }
            _ => Vec::new(),
        },
        Msg::NoEntries { address } => finish(&mut book, &address, DoneReason::NoEntries),
        Msg::RequestFailed { address } => finish(&mut book, &address, DoneReason::Failed),
        Msg::NoOp => Vec::new(),
    };

    (book, effects)
}

fn finish(book: &mut CrawlBook, address: &str, reason: DoneReason) -> Vec<Effect> {
    match book.phase(address) {
        Some(AddressPhase::Root) | Some(AddressPhase::Paging(_)) => {
            book.set_phase(address, AddressPhase::Done);
            vec![Effect::AddressDone {
                address: address.to_string(),
                reason,
            }]
        }
        Some(AddressPhase::Done) | None => Vec::new(),
    }
}
