//! Bidirectional English/Indonesian phrase dictionary.
//!
//! The forward map (English -> Indonesian) is the source of truth. The reverse
//! map is derived from it and kept in step on every insertion.

use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DictionaryError {
    #[error("'{indonesian}' is already the translation of '{existing}', cannot also map '{english}' to it")]
    ReverseCollision {
        indonesian: String,
        existing: String,
        english: String,
    },
}

/// English -> Indonesian phrase table with a derived reverse index.
///
/// Keys are case-sensitive. When two English keys map to the same Indonesian
/// value, the reverse map keeps the most recent key (last write wins). Use
/// [`TranslationDictionary::try_from_entries`] to reject such tables instead.
#[derive(Debug, Clone, Default)]
pub struct TranslationDictionary {
    forward: HashMap<String, String>,
    reverse: HashMap<String, String>,
}

impl TranslationDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dictionary, letting later entries win on reverse collisions.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut dictionary = Self::new();
        for (english, indonesian) in entries {
            dictionary.insert(english, indonesian);
        }
        dictionary
    }

    /// Build a dictionary, failing on the first Indonesian value claimed by
    /// two different English keys.
    pub fn try_from_entries<'a>(
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, DictionaryError> {
        let mut dictionary = Self::new();
        for (english, indonesian) in entries {
            if let Some(existing) = dictionary.reverse.get(indonesian) {
                if existing != english {
                    return Err(DictionaryError::ReverseCollision {
                        indonesian: indonesian.to_string(),
                        existing: existing.clone(),
                        english: english.to_string(),
                    });
                }
            }
            dictionary.insert(english, indonesian);
        }
        Ok(dictionary)
    }

    /// The built-in storefront phrase table.
    pub fn storefront() -> Self {
        Self::from_entries(STOREFRONT_PHRASES.iter().copied())
    }

    /// Insert a pair into both maps. Empty arguments are ignored.
    ///
    /// # Returns
    /// `true` if the pair was inserted.
    pub fn insert(&mut self, english: &str, indonesian: &str) -> bool {
        if english.is_empty() || indonesian.is_empty() {
            return false;
        }

        // Re-keying an English phrase releases its old reverse entry. If another
        // key still translates to that value, the entry falls back to it.
        if let Some(previous) = self.forward.get(english).cloned() {
            if previous != indonesian
                && self.reverse.get(&previous).map(String::as_str) == Some(english)
            {
                let fallback = self
                    .forward
                    .iter()
                    .filter(|(key, value)| key.as_str() != english && **value == previous)
                    .map(|(key, _)| key)
                    .min()
                    .cloned();
                match fallback {
                    Some(key) => {
                        self.reverse.insert(previous, key);
                    }
                    None => {
                        self.reverse.remove(&previous);
                    }
                }
            }
        }

        if let Some(existing) = self.reverse.get(indonesian) {
            if existing != english {
                warn!(
                    "Dictionary collision: '{}' already translates '{}', now mapped from '{}'",
                    indonesian, existing, english
                );
            }
        }

        self.forward
            .insert(english.to_string(), indonesian.to_string());
        self.reverse
            .insert(indonesian.to_string(), english.to_string());
        true
    }

    /// Look up the Indonesian translation of an English phrase.
    pub fn to_indonesian(&self, english: &str) -> Option<&str> {
        self.forward.get(english).map(String::as_str)
    }

    /// Look up the English source of an Indonesian phrase.
    pub fn to_english(&self, indonesian: &str) -> Option<&str> {
        self.reverse.get(indonesian).map(String::as_str)
    }

    pub fn contains_english(&self, text: &str) -> bool {
        self.forward.contains_key(text)
    }

    pub fn contains_indonesian(&self, text: &str) -> bool {
        self.reverse.contains_key(text)
    }

    /// Number of English keys.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Iterate over (English, Indonesian) pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.forward.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Storefront UI phrases. Indonesian values are unique.
pub const STOREFRONT_PHRASES: &[(&str, &str)] = &[
    // Navigation
    ("Home", "Beranda"),
    ("Shop", "Belanja"),
    ("Products", "Produk"),
    ("Collections", "Koleksi"),
    ("New Arrivals", "Produk Terbaru"),
    ("About Us", "Tentang Kami"),
    ("Contact", "Kontak"),
    ("Cart", "Keranjang"),
    ("Login", "Masuk"),
    ("Register", "Daftar"),
    ("Logout", "Keluar"),
    ("Profile", "Profil"),
    ("Search", "Cari"),
    // Catalogue
    ("Add to Cart", "Tambah ke Keranjang"),
    ("Buy Now", "Beli Sekarang"),
    ("Out of Stock", "Stok Habis"),
    ("In Stock", "Tersedia"),
    ("Size", "Ukuran"),
    ("Color", "Warna"),
    ("Price", "Harga"),
    ("Quantity", "Jumlah"),
    ("Description", "Deskripsi"),
    ("Sale", "Diskon"),
    ("Limited Edition", "Edisi Terbatas"),
    ("View Details", "Lihat Detail"),
    ("Shop Now", "Belanja Sekarang"),
    ("Hoodies", "Jaket Hoodie"),
    ("Shirts", "Kemeja"),
    ("Jackets", "Jaket"),
    ("Pants", "Celana"),
    ("Accessories", "Aksesori"),
    ("Shoes", "Sepatu"),
    // Cart & checkout
    ("Your cart is empty", "Keranjang Anda kosong"),
    ("Continue Shopping", "Lanjut Belanja"),
    ("Checkout", "Pembayaran"),
    ("Subtotal", "Subtotal Belanja"),
    ("Shipping", "Pengiriman"),
    ("Tax", "Pajak"),
    ("Total", "Total Bayar"),
    ("Free", "Gratis"),
    ("Personal Information", "Informasi Pribadi"),
    ("Address", "Alamat"),
    ("Delivery", "Metode Pengiriman"),
    ("Payment", "Metode Pembayaran"),
    ("Confirmation", "Konfirmasi"),
    ("Full Name", "Nama Lengkap"),
    ("Email", "Surel"),
    ("Phone", "Telepon"),
    ("City", "Kota"),
    ("ZIP Code", "Kode Pos"),
    ("Country", "Negara"),
    ("Card Number", "Nomor Kartu"),
    ("Expiry Date", "Tanggal Kedaluwarsa"),
    ("Cardholder Name", "Nama Pemegang Kartu"),
    ("Credit Card", "Kartu Kredit"),
    ("E-Wallet", "Dompet Digital"),
    ("Cash on Delivery", "Bayar di Tempat"),
    ("Standard Delivery", "Pengiriman Standar"),
    ("Express Delivery", "Pengiriman Kilat"),
    ("Next", "Lanjut"),
    ("Back", "Kembali"),
    ("Place Order", "Buat Pesanan"),
    ("Processing", "Memproses"),
    ("Try Again", "Coba Lagi"),
    ("Payment failed", "Pembayaran gagal"),
    ("Order placed successfully", "Pesanan berhasil dibuat"),
    ("Thank you for your order", "Terima kasih atas pesanan Anda"),
    ("This field is required", "Kolom ini wajib diisi"),
    ("Invalid email address", "Alamat surel tidak valid"),
    // FAQ & footer
    ("Frequently Asked Questions", "Pertanyaan yang Sering Diajukan"),
    ("All", "Semua"),
    ("Orders", "Pesanan"),
    ("Returns", "Pengembalian"),
    ("Follow Us", "Ikuti Kami"),
    ("Newsletter", "Buletin"),
    ("Subscribe", "Berlangganan"),
    ("All rights reserved", "Hak cipta dilindungi"),
    // Single words used in longer copy
    ("New", "Baru"),
    ("Best", "Terbaik"),
    ("Streetwear", "Busana Jalanan"),
    ("Style", "Gaya"),
    ("Quality", "Kualitas"),
    ("Week", "Minggu"),
];
